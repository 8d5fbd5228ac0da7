//! Configuration management for flapboard.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::records::EntityKind;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flapboard";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "board.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "FLAPBOARD_";

/// Placeholder printed in place of secrets.
const REDACTED: &str = "********";

/// Upper bound for `gate.max_limit_secs`: one day.
const MAX_LIMIT_SECS: u64 = 86_400;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLAPBOARD_`, `__` between
///    section and key, e.g. `FLAPBOARD_BOARD__API_KEY`)
/// 2. TOML config file at `~/.config/flapboard/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Board (display transport) configuration.
    pub board: BoardConfig,
    /// Weather source configuration.
    pub weather: WeatherConfig,
    /// Rate gate policy.
    pub gate: GateConfig,
    /// Record retention limits.
    pub limits: LimitsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flapboard/board.db`
    pub database_path: Option<PathBuf>,
}

/// Board write endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Write endpoint URL.
    pub api_url: String,
    /// Read/write key sent with every request.
    pub api_key: Option<String>,
    /// Append a `t=<millis>` query parameter to defeat caches.
    pub cache_bust: bool,
}

/// Weather source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Current-conditions endpoint URL.
    pub api_url: String,
    /// API key.
    pub api_key: Option<String>,
    /// Location query (`City,CountryCode`).
    pub location: String,
    /// Unit system passed to the source.
    pub units: String,
}

/// Rate gate policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum seconds between sends of a spaced kind.
    pub min_spacing_secs: u64,
    /// Kinds whose sends are spaced out.
    pub spaced_kinds: Vec<EntityKind>,
    /// Limit window when a 429 carries no usable `Retry-After`.
    pub default_retry_after_secs: u64,
    /// Statuses treated as an unannounced rate limit.
    pub implicit_limit_statuses: Vec<u16>,
    /// Limit window for those statuses.
    pub implicit_limit_secs: u64,
    /// Longest limit window the gate will honour; longer ones are capped.
    pub max_limit_secs: u64,
}

/// How many records each list keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Flights kept in storage; older ones are dropped on add.
    pub flights_stored: usize,
    /// Flights returned when listing.
    pub flights_loaded: usize,
    /// Events kept in storage.
    pub events_stored: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_url: "https://rw.vestaboard.com/".to_string(),
            api_key: None,
            cache_bust: true,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            api_key: None,
            location: "Bentonville,US".to_string(),
            units: "imperial".to_string(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_spacing_secs: 5,
            spaced_kinds: vec![EntityKind::PrivatePilot],
            default_retry_after_secs: 300,
            implicit_limit_statuses: vec![403, 503],
            implicit_limit_secs: 300,
            max_limit_secs: 3600,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            flights_stored: 5,
            flights_loaded: 10,
            events_stored: 5,
        }
    }
}

impl GateConfig {
    /// Minimum spacing as a Duration.
    #[must_use]
    pub fn min_spacing(&self) -> Duration {
        Duration::from_secs(self.min_spacing_secs)
    }

    /// Default 429 window as a Duration.
    #[must_use]
    pub fn default_retry_after(&self) -> Duration {
        Duration::from_secs(self.default_retry_after_secs)
    }

    /// Implicit limit window as a Duration.
    #[must_use]
    pub fn implicit_limit(&self) -> Duration {
        Duration::from_secs(self.implicit_limit_secs)
    }

    /// Longest limit window as a Duration.
    #[must_use]
    pub fn max_limit(&self) -> Duration {
        Duration::from_secs(self.max_limit_secs)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FLAPBOARD_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation
    /// fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation
    /// fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.gate.implicit_limit_secs == 0 {
            return Err(invalid("implicit_limit_secs must be greater than 0"));
        }

        if self.gate.default_retry_after_secs == 0 {
            return Err(invalid("default_retry_after_secs must be greater than 0"));
        }

        if self.gate.max_limit_secs == 0 || self.gate.max_limit_secs > MAX_LIMIT_SECS {
            return Err(invalid(format!(
                "max_limit_secs must be between 1 and {MAX_LIMIT_SECS}"
            )));
        }

        for (key, value) in [
            ("min_spacing_secs", self.gate.min_spacing_secs),
            ("default_retry_after_secs", self.gate.default_retry_after_secs),
            ("implicit_limit_secs", self.gate.implicit_limit_secs),
        ] {
            if value > self.gate.max_limit_secs {
                return Err(invalid(format!(
                    "{key} ({value}) cannot exceed max_limit_secs ({})",
                    self.gate.max_limit_secs
                )));
            }
        }

        for &status in &self.gate.implicit_limit_statuses {
            if (200..300).contains(&status) || status == 429 {
                return Err(invalid(format!(
                    "implicit_limit_statuses cannot contain {status}"
                )));
            }
        }

        if self.limits.flights_stored == 0 || self.limits.events_stored == 0 {
            return Err(invalid("flights_stored and events_stored must be greater than 0"));
        }

        if self.limits.flights_loaded < self.limits.flights_stored {
            return Err(invalid(format!(
                "flights_loaded ({}) cannot be less than flights_stored ({})",
                self.limits.flights_loaded, self.limits.flights_stored
            )));
        }

        for (key, value) in [
            ("board.api_url", &self.board.api_url),
            ("weather.api_url", &self.weather.api_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(invalid(format!("{key} is not a valid URL: {value}")));
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// A copy safe to print: configured keys are masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for key in [&mut config.board.api_key, &mut config.weather.api_key] {
            if key.is_some() {
                *key = Some(REDACTED.to_string());
            }
        }
        config
    }

    /// Render as a TOML document that [`Config::load_from`] can read back.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
