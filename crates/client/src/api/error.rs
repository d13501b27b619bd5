//! Errors that can occur when talking to the remote API.

use thiserror::Error;

/// Errors returned by the REST gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response (connection refused, timeout, DNS).
    #[error("Request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or a truncated body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body had an unexpected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether retrying the same request later may succeed.
    ///
    /// Transport failures, rate limiting, timeouts and 5xx responses are
    /// transient; client errors and unparseable bodies are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) | Self::RateLimited(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Parse(_) | Self::NotFound(_) | Self::Malformed(_) => false,
        }
    }

    /// HTTP status, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Request(err.to_string()),
        }
    }
}
