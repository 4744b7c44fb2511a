//! Shared error types for collaborator interfaces.

use crate::entities::PublicAddress;
use thiserror::Error;

/// Identity directory lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// No profile is registered for the address.
    #[error("no identity profile for address {0:?}")]
    NotFound(PublicAddress),

    /// The directory could not be reached.
    #[error("identity directory unavailable: {0}")]
    Unavailable(String),
}

/// Mempool submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// The mempool refused the transaction.
    #[error("mempool rejected transaction: {0}")]
    Rejected(String),

    /// The mempool could not be reached.
    #[error("mempool unavailable: {0}")]
    Unavailable(String),
}
