//! Store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid score: {0}")]
    InvalidScore(f64),

    #[error("Invalid index member: {0}")]
    InvalidMember(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
