//! Display transport.
//!
//! [`DisplayTransport`] is the seam to the board's write endpoint; the
//! production implementation is [`HttpTransport`]. [`DisplayClient`]
//! puts a transport behind the [`RateGate`] and is what the service
//! layer calls.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA, RETRY_AFTER};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::board::DisplayMatrix;
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::gate::RateGate;
use crate::records::EntityKind;

/// Header carrying the board's read/write key.
pub const API_KEY_HEADER: &str = "X-Vestaboard-Read-Write-Key";

/// The parts of a board response the gate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Retry-After` header, if present.
    pub retry_after: Option<String>,
    /// Response body.
    pub body: String,
}

impl TransportResponse {
    /// A bare response with the given status.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }
}

/// Something that can deliver a matrix to the board.
#[async_trait]
pub trait DisplayTransport: Send + Sync {
    /// Deliver one matrix and report how the board answered.
    ///
    /// # Errors
    ///
    /// Returns an error only if no response was received at all;
    /// non-success statuses are reported in the response.
    async fn post(&self, matrix: &DisplayMatrix) -> Result<TransportResponse>;
}

/// Posts matrices to the board's HTTP write endpoint.
///
/// No client timeout is set; a send is bounded only by the remote end.
pub struct HttpTransport {
    http: reqwest::Client,
    url: Url,
    api_key: Option<String>,
    cache_bust: bool,
}

impl HttpTransport {
    /// Build a transport from board configuration.
    ///
    /// A missing key is not an error here; it fails the first send instead
    /// so that previews work without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: &BoardConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            url: Url::parse(&config.api_url)?,
            api_key: config.api_key.clone(),
            cache_bust: config.cache_bust,
        })
    }

    /// The request URL for a send made now.
    fn request_url(&self) -> Url {
        let mut url = self.url.clone();
        if self.cache_bust {
            let millis = chrono::Utc::now().timestamp_millis();
            url.query_pairs_mut().append_pair("t", &millis.to_string());
        }
        url
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .field("cache_bust", &self.cache_bust)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DisplayTransport for HttpTransport {
    async fn post(&self, matrix: &DisplayMatrix) -> Result<TransportResponse> {
        let api_key = self.api_key.as_deref().ok_or(Error::MissingCredential {
            name: "board.api_key",
        })?;
        let url = self.request_url();
        debug!(%url, "POST board matrix");

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .json(matrix)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        debug!(status, ?retry_after, "Board responded");

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// What happened to a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The board accepted the matrix.
    Sent,
    /// A send of the same kind was already running; nothing was sent.
    SkippedInFlight,
}

/// A transport behind the rate gate.
pub struct DisplayClient {
    transport: Arc<dyn DisplayTransport>,
    gate: RateGate,
}

impl DisplayClient {
    /// Combine a transport with a gate.
    #[must_use]
    pub fn new(transport: Arc<dyn DisplayTransport>, gate: RateGate) -> Self {
        Self { transport, gate }
    }

    /// The gate, for status queries.
    #[must_use]
    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Send a matrix for `kind`.
    ///
    /// Fails fast while a limit window is open, waits out the minimum
    /// spacing for spaced kinds, and skips the send if another send of
    /// the same kind is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] if the board is (or becomes) rate
    /// limited, [`Error::TransportStatus`] for other failure statuses, and
    /// any error from the transport itself.
    pub async fn send(&self, kind: EntityKind, matrix: &DisplayMatrix) -> Result<SendOutcome> {
        let Some(_permit) = self.gate.try_acquire(kind) else {
            warn!(%kind, "Board send already in flight, skipping");
            return Ok(SendOutcome::SkippedInFlight);
        };

        self.gate.check()?;
        self.gate.before_send(kind).await;
        self.gate.check()?;

        debug!(%kind, rows = ?matrix.to_codes(), "Sending matrix");
        let result = self.transport.post(matrix).await;
        self.gate.record_attempt(kind);

        let response = result.map_err(|e| {
            error!(%kind, error = %e, "Board transport failed");
            e
        })?;
        if let Err(e) = self.gate.on_response(&response) {
            if !e.is_rate_limited() {
                error!(%kind, error = %e, "Board rejected update");
            }
            return Err(e);
        }

        info!(%kind, "Board updated");
        Ok(SendOutcome::Sent)
    }
}

impl fmt::Debug for DisplayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayClient")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
