//! Indexing error types.
//!
//! Handlers surface no errors for expected conditions: duplicate
//! creates, already-members and missing rows are no-ops because the
//! validator is the sole gate. What does surface here halts the
//! indexing worker.

use feeds_store::StoreError;
use shared_types::entities::FeedId;
use shared_types::transactions::TransactionKind;
use thiserror::Error;

/// Fatal indexing failures.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// A validated transaction reached the dispatcher with a kind no
    /// handler claims. This is an indexing bug, not a runtime
    /// rejection.
    #[error("no handler for transaction kind {0}")]
    UnknownKind(TransactionKind),

    /// A group invariant did not hold after a committed transaction.
    #[error("invariant violation on group {feed_id}: {detail}")]
    InvariantViolation {
        /// The group that failed the audit.
        feed_id: FeedId,
        /// Which invariant broke.
        detail: String,
    },

    /// The authoritative store failed outside the expected-conflict
    /// paths.
    #[error(transparent)]
    Store(#[from] StoreError),
}
