//! Transport error types.

use thiserror::Error;

/// Errors raised while talking to the Bot API.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with something that is not a Bot API response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The transport configuration is unusable.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(feature = "http-client")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
