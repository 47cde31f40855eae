//! Error types for the linecam environment abstraction.

use thiserror::Error;

/// Errors raised while talking to the remote line store.
///
/// Network failures and decode failures are kept apart so callers can
/// decide which ones are worth surfacing to the user. Nothing is retried.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success status code
    #[error("request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    /// The request never produced a response (connect, timeout, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request body could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// The base URL or request path did not form a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a decode error.
    pub fn decode(msg: impl std::fmt::Display) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Returns true if the failure came from a non-success status.
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}
