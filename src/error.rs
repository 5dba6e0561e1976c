//! Error types for nav-prefetch.

use thiserror::Error;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, PrefetchError>;

/// Errors surfaced while setting up or configuring the prefetch subsystem.
///
/// Nothing on the event path returns these: intent handlers and the
/// scheduler log and drop failures instead.
#[derive(Error, Debug)]
pub enum PrefetchError {
    #[error("No tokio runtime available: the scheduler must be built inside a runtime")]
    NoRuntime,

    #[error("Invalid page origin {origin:?}: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Failure reported by a [`Router`](crate::navigation::Router) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Route not found: {0}")]
    NotFound(String),

    #[error("Router unavailable: {0}")]
    Unavailable(String),
}
