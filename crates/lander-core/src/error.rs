// error.rs — Error types shared by every layer of the landing pipeline.
//
// The orchestrator re-raises the error of the step that failed, so the
// driver, composer, and gateway all speak this one enum. It is Clone
// because deduplicated callers share a single attempt's outcome.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while landing, rolling back, or tracking a fix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LanderError {
    /// The version-control tool exited non-zero.
    #[error("git command failed: `{command}`: {stderr}")]
    GitCommand { command: String, stderr: String },

    /// A touched file is forbidden, not allow-listed, or exceeds a limit.
    #[error("security violation for {path}: {reason}")]
    SecurityViolation { path: String, reason: String },

    /// Missing or invalid settings, or an operation disabled by config.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A remote review was requested but no provider is configured.
    #[error("review integration not configured: {0}")]
    IntegrationNotConfigured(String),

    /// Rollback is impossible for this record.
    #[error("rollback error: {0}")]
    Rollback(String),

    /// The remote review provider rejected or failed a request.
    #[error("review provider error: {0}")]
    Review(String),

    /// The upstream fix cannot be landed as given.
    #[error("invalid fix: {0}")]
    InvalidFix(String),

    /// The requested commit record was not found.
    #[error("commit record not found: {0}")]
    NotFound(Uuid),

    /// Invalid state transition.
    #[error("invalid transition from {from} to {to} for record {record_id}")]
    InvalidTransition {
        record_id: Uuid,
        from: String,
        to: String,
    },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// Failed to serialize/deserialize pipeline data.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A landing task ended without producing an outcome (panic or shutdown).
    #[error("landing attempt aborted: {0}")]
    Aborted(String),
}

impl LanderError {
    /// Wrap an I/O error together with the path it concerned.
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        LanderError::Io {
            path: path.to_string(),
            message: source.to_string(),
        }
    }
}

impl From<serde_json::Error> for LanderError {
    fn from(e: serde_json::Error) -> Self {
        LanderError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LanderError>;
