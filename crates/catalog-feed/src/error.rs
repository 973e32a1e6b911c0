//! Error types for page fetches.

use std::time::Duration;
use thiserror::Error;

/// Why a single page fetch failed
///
/// Every variant is transient from the controller's point of view: the
/// sequence keeps its state and the next trigger may try again.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("page fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Source(String),
}

impl FetchError {
    pub fn source_error(message: impl Into<String>) -> Self {
        FetchError::Source(message.into())
    }

    /// Retry hint for a rate-limit rejection
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
