//! Fetch error taxonomy shared by remote lookup clients

use thiserror::Error;

/// A failed remote lookup that may succeed if retried later.
///
/// A card that does not exist is not a `FetchError`; lookups report it as a
/// negative answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection could not be established or was dropped
    #[error("network error: {0}")]
    Network(String),
    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,
    /// The remote service asked us to slow down (HTTP 429)
    #[error("rate limited by remote service")]
    RateLimited,
    /// Any other unexpected HTTP status
    #[error("HTTP error: {0}")]
    HttpStatus(u16),
    /// The response body could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Map a non-success HTTP status to a fetch error
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => FetchError::RateLimited,
            other => FetchError::HttpStatus(other),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::InvalidResponse(err.to_string())
    }
}
