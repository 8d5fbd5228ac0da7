//! Display rate gate.
//!
//! The board's write endpoint throttles aggressively. [`RateGate`] keeps
//! the process-wide view of that throttling:
//!
//! - an active limit window, opened by a 429 (or a status configured as
//!   an implicit limit) and closed by any later success or by expiry;
//! - the time of the last send per [`EntityKind`], used to space out
//!   sends of sensitive kinds by delaying the caller;
//! - a per-kind in-flight slot, so a second send of the same kind while
//!   one is running is skipped rather than queued.
//!
//! Time is read from [`tokio::time::Instant`], so tests can drive the gate
//! with a paused clock.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::error::{Error, Result};
use crate::records::EntityKind;
use crate::transport::TransportResponse;

/// Source recorded for an explicit 429.
pub const SOURCE_TOO_MANY_REQUESTS: &str = "HTTP 429 Too Many Requests";

/// Gate behaviour, usually built from [`GateConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    /// Minimum time between sends of a spaced kind.
    pub min_spacing: Duration,
    /// Kinds subject to spacing.
    pub spaced_kinds: HashSet<EntityKind>,
    /// Window used when a 429 has no usable `Retry-After`.
    pub default_retry_after: Duration,
    /// Statuses treated as an unannounced limit.
    pub implicit_limit_statuses: Vec<u16>,
    /// Window used for those statuses.
    pub implicit_limit: Duration,
    /// Longest window honoured; a longer `Retry-After` is capped to it.
    pub max_limit: Duration,
}

impl From<&GateConfig> for GatePolicy {
    fn from(config: &GateConfig) -> Self {
        Self {
            min_spacing: config.min_spacing(),
            spaced_kinds: config.spaced_kinds.iter().copied().collect(),
            default_retry_after: config.default_retry_after(),
            implicit_limit_statuses: config.implicit_limit_statuses.clone(),
            implicit_limit: config.implicit_limit(),
            max_limit: config.max_limit(),
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::from(&GateConfig::default())
    }
}

/// Snapshot of the gate, shaped for display and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    /// Whether sends are currently refused.
    pub is_limited: bool,
    /// Wall-clock end of the window.
    pub limit_expires: Option<DateTime<Utc>>,
    /// Whole seconds left in the window, rounded up.
    pub time_remaining: Option<u64>,
    /// What opened the window.
    pub source: Option<String>,
    /// Human-readable summary.
    pub message: String,
}

#[derive(Debug)]
struct ActiveLimit {
    expires: Instant,
    expires_at: Option<DateTime<Utc>>,
    source: String,
}

#[derive(Debug, Default)]
struct GateState {
    limit: Option<ActiveLimit>,
    last_send: HashMap<EntityKind, Instant>,
}

/// Process-wide rate limiting for board sends.
#[derive(Debug)]
pub struct RateGate {
    policy: GatePolicy,
    state: Mutex<GateState>,
    in_flight: Mutex<HashSet<EntityKind>>,
}

/// Seconds in `d`, rounded up.
fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Lock a mutex, recovering the data from a poisoned lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Parse a `Retry-After` value: delay seconds or an HTTP date.
///
/// A date already in the past yields a zero delay.
#[must_use]
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    Some((date.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO))
}

impl RateGate {
    /// Create a gate with the given policy.
    #[must_use]
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(GateState::default()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The gate's policy.
    #[must_use]
    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Fail fast if a limit window is open. An expired window is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] with the remaining seconds and the
    /// source of the limit.
    pub fn check(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if let Some(limit) = &state.limit {
            let now = Instant::now();
            if now < limit.expires {
                return Err(Error::RateLimited {
                    time_remaining_secs: ceil_secs(limit.expires - now),
                    limit_source: limit.source.clone(),
                });
            }
            info!(source = %limit.source, "Rate limit expired");
            state.limit = None;
        }
        Ok(())
    }

    /// Delay until a send of `kind` respects the minimum spacing.
    pub async fn before_send(&self, kind: EntityKind) {
        if !self.policy.spaced_kinds.contains(&kind) {
            return;
        }
        let wait = {
            let state = lock(&self.state);
            state
                .last_send
                .get(&kind)
                .and_then(|last| last.checked_add(self.policy.min_spacing))
                .and_then(|next| next.checked_duration_since(Instant::now()))
        };
        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            debug!(%kind, wait_ms = wait.as_millis(), "Spacing board send");
            tokio::time::sleep(wait).await;
        }
    }

    /// Record that a send of `kind` was attempted now.
    pub fn record_attempt(&self, kind: EntityKind) {
        lock(&self.state).last_send.insert(kind, Instant::now());
    }

    /// Update the gate from a transport response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] for a 429 or an implicit-limit
    /// status, and [`Error::TransportStatus`] for any other non-2xx.
    pub fn on_response(&self, response: &TransportResponse) -> Result<()> {
        let status = response.status;
        if (200..300).contains(&status) {
            let mut state = lock(&self.state);
            if let Some(limit) = state.limit.take() {
                info!(source = %limit.source, "Rate limit cleared by successful send");
            }
            return Ok(());
        }

        let (window, source) = if status == 429 {
            let window = response
                .retry_after
                .as_deref()
                .and_then(|value| parse_retry_after(value, Utc::now()))
                .unwrap_or(self.policy.default_retry_after);
            (window, SOURCE_TOO_MANY_REQUESTS.to_string())
        } else if self.policy.implicit_limit_statuses.contains(&status) {
            (self.policy.implicit_limit, implicit_source(status))
        } else {
            return Err(Error::TransportStatus {
                status,
                body: response.body.clone(),
            });
        };

        if window > self.policy.max_limit {
            warn!(
                requested_secs = window.as_secs(),
                max_secs = self.policy.max_limit.as_secs(),
                "Capping board rate limit window"
            );
        }
        let window = window.min(self.policy.max_limit);

        warn!(status, window_secs = window.as_secs(), %source, "Board rate limit detected");
        let now = Instant::now();
        let expires_at = chrono::Duration::from_std(window)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        lock(&self.state).limit = Some(ActiveLimit {
            expires: now.checked_add(window).unwrap_or(now),
            expires_at,
            source: source.clone(),
        });
        Err(Error::RateLimited {
            time_remaining_secs: ceil_secs(window),
            limit_source: source,
        })
    }

    /// Current state, clearing an expired window.
    #[must_use]
    pub fn status(&self) -> RateLimitState {
        let mut state = lock(&self.state);
        let Some(limit) = &state.limit else {
            return RateLimitState {
                is_limited: false,
                limit_expires: None,
                time_remaining: None,
                source: None,
                message: "No rate limit detected".to_string(),
            };
        };

        let now = Instant::now();
        if now < limit.expires {
            let remaining = ceil_secs(limit.expires - now);
            return RateLimitState {
                is_limited: true,
                limit_expires: limit.expires_at,
                time_remaining: Some(remaining),
                source: Some(limit.source.clone()),
                message: format!(
                    "Rate limited for {remaining} more seconds. Source: {}",
                    limit.source
                ),
            };
        }

        state.limit = None;
        RateLimitState {
            is_limited: false,
            limit_expires: None,
            time_remaining: None,
            source: None,
            message: "Rate limit expired".to_string(),
        }
    }

    /// Claim the in-flight slot for `kind`, or `None` if a send of that
    /// kind is already running. The slot is released when the permit
    /// drops.
    #[must_use]
    pub fn try_acquire(&self, kind: EntityKind) -> Option<SendPermit<'_>> {
        if lock(&self.in_flight).insert(kind) {
            Some(SendPermit { gate: self, kind })
        } else {
            None
        }
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(GatePolicy::default())
    }
}

fn implicit_source(status: u16) -> String {
    match status {
        403 => "HTTP 403 Forbidden - possible IP-based rate limit".to_string(),
        503 => "HTTP 503 Service Unavailable - possible throttling".to_string(),
        other => format!("HTTP {other} - possible rate limit"),
    }
}

/// Holds a kind's in-flight slot.
#[derive(Debug)]
pub struct SendPermit<'a> {
    gate: &'a RateGate,
    kind: EntityKind,
}

impl SendPermit<'_> {
    /// Kind the permit was issued for.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl Drop for SendPermit<'_> {
    fn drop(&mut self) {
        lock(&self.gate.in_flight).remove(&self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, retry_after: Option<&str>) -> TransportResponse {
        TransportResponse {
            status,
            retry_after: retry_after.map(str::to_string),
            body: String::new(),
        }
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(
            parse_retry_after(" 120 ", Utc::now()),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:30:00 GMT", now),
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_blocks_then_counts_down() {
        let gate = RateGate::default();
        let err = gate.on_response(&response(429, Some("120"))).unwrap_err();
        assert_eq!(err.time_remaining_secs(), Some(120));

        tokio::time::advance(Duration::from_secs(10)).await;
        let err = gate.check().unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.time_remaining_secs(), Some(110));
        assert!(err.to_string().contains(SOURCE_TOO_MANY_REQUESTS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_without_header_uses_default_window() {
        let gate = RateGate::default();
        assert!(gate.on_response(&response(429, None)).is_err());
        assert_eq!(gate.check().unwrap_err().time_remaining_secs(), Some(300));

        assert!(gate.on_response(&response(429, Some("garbage"))).is_err());
        assert_eq!(gate.status().time_remaining, Some(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_retry_after_is_capped() {
        let gate = RateGate::default();
        let err = gate
            .on_response(&response(429, Some("18446744073709551615")))
            .unwrap_err();
        assert_eq!(err.time_remaining_secs(), Some(3600));

        let status = gate.status();
        assert!(status.is_limited);
        assert_eq!(status.time_remaining, Some(3600));
        assert!(gate.check().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_spacing_does_not_overflow() {
        let policy = GatePolicy {
            min_spacing: Duration::MAX,
            ..GatePolicy::default()
        };
        let gate = RateGate::new(policy);
        gate.record_attempt(EntityKind::PrivatePilot);

        let start = Instant::now();
        gate.before_send(EntityKind::PrivatePilot).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_expires() {
        let gate = RateGate::default();
        let _ = gate.on_response(&response(429, Some("30")));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(gate.check().is_ok());
        assert!(!gate.status().is_limited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_expiry_once() {
        let gate = RateGate::default();
        let _ = gate.on_response(&response(429, Some("5")));
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(gate.status().message, "Rate limit expired");
        assert_eq!(gate.status().message, "No rate limit detected");
    }

    #[test]
    fn test_success_clears_limit() {
        let gate = RateGate::default();
        let _ = gate.on_response(&response(503, None));
        assert!(gate.status().is_limited);

        assert!(gate.on_response(&response(200, None)).is_ok());
        assert!(gate.check().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_implicit_limit_statuses() {
        let gate = RateGate::default();
        let err = gate.on_response(&response(403, None)).unwrap_err();
        assert_eq!(err.time_remaining_secs(), Some(300));

        let status = gate.status();
        assert!(status.is_limited);
        assert!(status.source.unwrap().contains("403"));
        assert!(status.limit_expires.is_some());
        assert!(status.message.starts_with("Rate limited for 300 more seconds"));
    }

    #[test]
    fn test_implicit_statuses_are_configurable() {
        let config = GateConfig {
            implicit_limit_statuses: Vec::new(),
            ..GateConfig::default()
        };
        let gate = RateGate::new(GatePolicy::from(&config));
        let err = gate.on_response(&response(503, None)).unwrap_err();
        assert!(matches!(err, Error::TransportStatus { status: 503, .. }));
        assert!(gate.check().is_ok());
    }

    #[test]
    fn test_other_failures_do_not_limit() {
        let gate = RateGate::default();
        let err = gate.on_response(&response(500, None)).unwrap_err();
        assert!(!err.is_rate_limited());
        assert!(gate.check().is_ok());
        assert_eq!(gate.status().message, "No rate limit detected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_send_spaces_sensitive_kinds() {
        let gate = RateGate::default();
        gate.record_attempt(EntityKind::PrivatePilot);

        let start = Instant::now();
        gate.before_send(EntityKind::PrivatePilot).await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_send_no_wait_when_spacing_elapsed() {
        let gate = RateGate::default();
        gate.record_attempt(EntityKind::PrivatePilot);
        tokio::time::advance(Duration::from_secs(6)).await;

        let start = Instant::now();
        gate.before_send(EntityKind::PrivatePilot).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_send_ignores_unspaced_kinds() {
        let gate = RateGate::default();
        gate.record_attempt(EntityKind::Flights);

        let start = Instant::now();
        gate.before_send(EntityKind::Flights).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_in_flight_slot_per_kind() {
        let gate = RateGate::default();
        let permit = gate.try_acquire(EntityKind::Flights).unwrap();
        assert_eq!(permit.kind(), EntityKind::Flights);
        assert!(gate.try_acquire(EntityKind::Flights).is_none());
        assert!(gate.try_acquire(EntityKind::Events).is_some());

        drop(permit);
        assert!(gate.try_acquire(EntityKind::Flights).is_some());
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_value(RateGate::default().status()).unwrap();
        assert_eq!(json["isLimited"], false);
        assert!(json.get("timeRemaining").is_some());
    }
}
