//! Store error types.

use shared_types::entities::{FeedId, PublicAddress};
use thiserror::Error;

/// Feeds store error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No personal or chat feed with this id.
    #[error("feed not found: {0}")]
    FeedNotFound(FeedId),

    /// No group feed with this id.
    #[error("group feed not found: {0}")]
    GroupNotFound(FeedId),

    /// No participant row for this (feed, address) pair.
    #[error("participant {address:?} not found in group {feed_id}")]
    ParticipantNotFound {
        /// Group looked up.
        feed_id: FeedId,
        /// Address looked up.
        address: PublicAddress,
    },

    /// A write collided with existing state (duplicate feed id,
    /// non-monotonic key generation).
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// The storage backend failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = FeedId::generate();
        let err = StoreError::GroupNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_conflict_display() {
        let err = StoreError::Conflict("generation 3 after 1".to_string());
        assert!(err.to_string().contains("generation 3"));
    }
}
