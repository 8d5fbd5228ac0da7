//! Error types for flapboard.
//!
//! This module defines all error types used throughout the flapboard crate,
//! from record validation through persistence to the display transport.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flapboard operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A document query referenced an unusable field name.
    #[error("invalid query field: {field}")]
    InvalidQueryField {
        /// The offending field name.
        field: String,
    },

    /// The requested record does not exist.
    #[error("{collection} record not found: {id}")]
    NotFound {
        /// Collection that was searched.
        collection: &'static str,
        /// Identifier (or index) that was requested.
        id: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A credential required for an outbound call is not configured.
    #[error("missing credential: {name}")]
    MissingCredential {
        /// Name of the configuration key that must be set.
        name: &'static str,
    },

    // === Record Errors ===
    /// A domain record is missing a required field or has a malformed one.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === Display Errors ===
    /// The board is rate limited; the send was not attempted.
    #[error("board rate limited for {time_remaining_secs} more seconds ({limit_source})")]
    RateLimited {
        /// Seconds until the limit window closes.
        time_remaining_secs: u64,
        /// What triggered the limit.
        limit_source: String,
    },

    /// The board answered with a non-success status.
    #[error("board returned HTTP {status}: {body}")]
    TransportStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// HTTP transport error (connection refused, DNS failure, etc.).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // === Weather Errors ===
    /// The weather source failed or returned an unusable payload.
    #[error("weather source error: {message}")]
    Weather {
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flapboard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new weather source error.
    #[must_use]
    pub fn weather(message: impl Into<String>) -> Self {
        Self::Weather {
            message: message.into(),
        }
    }

    /// Check if this error is a board rate limit.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if this error is a record validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Seconds remaining on the rate limit, if this is one.
    #[must_use]
    pub fn time_remaining_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                time_remaining_secs,
                ..
            } => Some(*time_remaining_secs),
            _ => None,
        }
    }
}
