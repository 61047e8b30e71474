//! Error taxonomy shared by every crate of the offline subsystem.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for calls against the remote API.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create connection pool: {0}")]
    PoolCreationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Retry policy class for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Failure reported by a [`crate::remote::RemoteApi`] implementation.
///
/// `status` is the HTTP status when the server answered, `None` when the
/// request never produced a response (DNS, refused connection, timeout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "({}) {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Client-side rejections (4xx). These are never queued or retried by the
    /// online-first command path.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, Some(400..=499))
    }

    /// Classify the failure for queued-mutation replay.
    pub fn retry_class(&self) -> RetryClass {
        match self.status {
            None => RetryClass::Retryable,
            Some(401 | 403) => RetryClass::ReauthRequired,
            Some(408 | 409 | 423 | 425 | 429) => RetryClass::Retryable,
            Some(500..=599) => RetryClass::Retryable,
            Some(_) => RetryClass::Permanent,
        }
    }
}
