//! Errors raised by data providers.
//!
//! Every variant is recovered by the scan pipeline as "no data for this
//! symbol from this source"; none of them reach the caller.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The call did not finish within its per-call timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS, or body transfer failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {0}")]
    Status(u16),

    /// The provider answered with something other than JSON.
    #[error("unexpected content type: {0}")]
    ContentType(String),

    /// The body parsed but did not have the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FeedError {
    /// Short tag used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Timeout(_) => "timeout",
            FeedError::Transport(_) => "transport",
            FeedError::Status(_) => "status",
            FeedError::ContentType(_) => "content_type",
            FeedError::Malformed(_) => "malformed",
        }
    }
}
