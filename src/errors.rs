//! Error types for the connection pool

use std::sync::Arc;
use thiserror::Error;

/// Boxed error produced by connection factories and connection teardown
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("connection pool is closed")]
    Closed,

    #[error("timed out waiting for a free connection slot")]
    Timeout,

    #[error("the connection was already returned to the pool")]
    AlreadyClosed,

    #[error("returning a connection into a full pool")]
    PoolFull,

    #[error("connection factory failed: {0}")]
    Factory(#[source] Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl PoolError {
    pub(crate) fn factory(err: BoxError) -> Self {
        PoolError::Factory(Arc::from(err))
    }

    /// Whether retrying the acquire can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, PoolError::Timeout | PoolError::Factory(_))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
