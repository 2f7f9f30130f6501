//! Error types for talking to the telemetry service.

use thiserror::Error;

/// Errors that end a fetch cycle.
///
/// Transport failures and decode failures are treated the same way by
/// sessions: the cycle ends `Failed` and the next tick tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The service answered with a non-2xx status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The body was not JSON or not the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    /// True for network-level failures, false for bad payloads.
    pub fn is_transport(&self) -> bool {
        !matches!(self, FetchError::Decode(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
