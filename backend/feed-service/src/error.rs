/// Error types for Feed Service
///
/// The serving path only ever surfaces store failures; collaborator and
/// precompute failures stay inside the background jobs.
use feed_store::{FeedKind, StoreError};
use std::time::Duration;
use thiserror::Error;

/// Result type for feed-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Feed index or signal backend failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Object store, trend source or candidate service failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Upstream(format!("request timed out: {}", err))
        } else {
            AppError::Upstream(err.to_string())
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Store(StoreError::Redis(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failed: {}", err))
    }
}

/// Failure of one precompute run
#[derive(Error, Debug)]
pub enum PrecomputeError {
    #[error("No source registered for {0} feeds")]
    NoSource(FeedKind),

    #[error("Source fetch failed: {0}")]
    Source(String),

    #[error("Source fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<AppError> for PrecomputeError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Store(e) => PrecomputeError::Store(e),
            AppError::Timeout(d) => PrecomputeError::Timeout(d),
            other => PrecomputeError::Source(other.to_string()),
        }
    }
}
