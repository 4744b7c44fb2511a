//! Cache error types.
//!
//! Cache failures are always non-fatal: write paths log and continue,
//! read paths fall back to the store.

use thiserror::Error;

/// Cache operation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// A key held a different structure than the operation expects.
    #[error("cache key {key} holds a different structure")]
    TypeMismatch {
        /// The offending key.
        key: String,
    },

    /// A cached document failed to (de)serialize.
    #[error("cache codec failure: {0}")]
    Codec(String),
}

/// Shorthand used throughout the cache crate.
pub type CacheResult<T> = Result<T, CacheError>;
