//! Rotation error types.

use feeds_store::StoreError;
use shared_types::entities::{FeedId, PublicAddress};
use thiserror::Error;

/// Key rotation failures. Any of these leaves the group at its previous
/// generation; a rotation is never partially persisted.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The group does not exist or has no key generations.
    #[error("unknown feed: {0}")]
    UnknownFeed(FeedId),

    /// The membership delta left nobody entitled.
    #[error("group {0} has no entitled members to rotate for")]
    EmptyMembership(FeedId),

    /// More entitled members than one rotation may carry.
    #[error("membership of {count} exceeds rotation cap {max}")]
    OversizedMembership {
        /// Entitled members after the delta.
        count: usize,
        /// Configured cap.
        max: usize,
    },

    /// A member's encryption key could not be resolved in time.
    #[error("identity unavailable for {0:?}")]
    IdentityUnavailable(PublicAddress),

    /// Wrapping the epoch key for a member failed.
    #[error("encryption failed for {0:?}")]
    EncryptionFailed(PublicAddress),

    /// The store rejected the rotation.
    #[error(transparent)]
    Store(#[from] StoreError),
}
