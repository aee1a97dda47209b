//! Error types for Fedimirror
//!
//! All errors in the application are converted to `ImportError`.
//! Variants map onto the pipeline's propagation policy: `Config` and
//! `Auth` abort an invocation before or at the fetch stage, `Transport`
//! and `Malformed` abort the current stage, while per-status and
//! per-attachment failures are handled (skip and continue) at the call
//! site and never bubble up as batch failures.

use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Missing or invalid instance URL / credentials; halts the
    /// invocation before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token missing, expired, or rejected by the remote instance
    #[error("Authorization error: {0}")]
    Auth(String),

    /// Timeout, DNS failure, or non-2xx response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unparseable or unexpectedly shaped remote payload
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Attachment download, validation, or store failure
    #[error("Media error: {0}")]
    Media(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ImportError {
    fn from(err: config::ConfigError) -> Self {
        ImportError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for ImportError {
    /// Classify client errors: anything that happened on the wire is a
    /// transport failure, a body that would not decode is malformed.
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ImportError::Malformed(err.to_string())
        } else {
            ImportError::Transport(err.to_string())
        }
    }
}

/// Result type alias using ImportError
pub type Result<T> = std::result::Result<T, ImportError>;
