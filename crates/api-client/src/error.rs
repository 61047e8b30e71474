//! Error types for the API client.

use fieldsafe_core::errors::RemoteError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiClientError>;

#[derive(Debug, Error)]
pub enum ApiClientError {
    /// Transport failure: connection refused, timeout, TLS, broken body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the API.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Missing or malformed access token.
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ApiClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ApiClientError> for RemoteError {
    fn from(err: ApiClientError) -> Self {
        match err {
            ApiClientError::Api { status, message } => RemoteError::http(status, message),
            ApiClientError::Http(err) => match err.status() {
                Some(status) => RemoteError::http(status.as_u16(), err.to_string()),
                None => RemoteError::transport(err.to_string()),
            },
            // Treated like a rejected request: retrying cannot fix a bad payload.
            ApiClientError::Json(err) => RemoteError::http(422, err.to_string()),
            ApiClientError::Auth(message) => RemoteError::http(401, message),
        }
    }
}
