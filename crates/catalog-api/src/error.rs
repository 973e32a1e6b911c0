//! Error types for the upstream catalog.

use thiserror::Error;

/// Failure talking to the upstream GraphQL API
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("upstream query error: {message}")]
    Query {
        status: Option<u16>,
        message: String,
    },

    #[error("malformed upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream response missing {0}")]
    MissingField(&'static str),
}

impl UpstreamError {
    /// HTTP status the upstream reported, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Query { status, .. } => *status,
            UpstreamError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Transport(_) => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
