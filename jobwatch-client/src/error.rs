//! Error types for the jobwatch client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when querying or submitting jobs
///
/// Only [`ClientError::Transient`] is worth retrying; every other variant is
/// permanent for the request that produced it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure or a gateway that is temporarily unavailable
    #[error("transient network error: {0}")]
    Transient(String),

    /// The backend does not know the job id
    #[error("job not found: {0}")]
    NotFound(String),

    /// Credentials were missing or rejected
    #[error("unauthorized (status {status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport failure (TLS setup, redirect loops, ...)
    #[error("HTTP request failed: {0}")]
    RequestFailed(reqwest::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        // A connection reset mid-request surfaces as a request or body error
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            Self::Transient(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::RequestFailed(err)
        }
    }
}

impl ClientError {
    /// Create an error from a non-success status code and its body
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthorized { status, message },
            429 | 502 | 503 | 504 => {
                Self::Transient(format!("status {}: {}", status, message))
            }
            _ => Self::ApiError { status, message },
        }
    }

    /// Check if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
            || matches!(self, Self::Unauthorized { .. })
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}
