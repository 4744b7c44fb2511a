//! # Block Indexer
//!
//! Routes every validated transaction in a block to the unique handler
//! for its kind. One logical worker per node: transactions apply one at
//! a time, in block order, and the next one does not start until the
//! previous handler has returned. Mid-transaction cancellation is not
//! supported; partial state would break the invariants.

use crate::audit;
use crate::context::HandlerContext;
use crate::errors::IndexingError;
use crate::handlers::HandlerRegistry;
use feeds_store::FeedsStore;
use shared_types::entities::{Block, FeedId};
use shared_types::transactions::{TransactionKind, TransactionPayload};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// The feed a transaction mutates as a group, if it is a group-mutating
/// kind; these get the post-commit invariant audit.
fn audited_group_target(payload: &TransactionPayload) -> Option<FeedId> {
    match payload.kind() {
        TransactionKind::NewPersonalFeed
        | TransactionKind::NewChatFeed
        | TransactionKind::NewFeedMessage => None,
        _ => Some(payload.feed_id()),
    }
}

/// Single-worker dispatcher over the handler registry.
pub struct BlockIndexer {
    registry: HandlerRegistry,
    store: Arc<dyn FeedsStore>,
    // Serializes blocks: the indexing path is one logical worker even
    // if multiple callers hold the indexer.
    worker: Mutex<()>,
}

impl BlockIndexer {
    /// Build an indexer with the default handler per kind.
    #[must_use]
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self {
            registry: HandlerRegistry::with_defaults(ctx.clone()),
            store: ctx.store.clone(),
            worker: Mutex::new(()),
        }
    }

    /// Apply every validated transaction of a block, in order.
    ///
    /// # Errors
    ///
    /// `UnknownKind` when no handler claims a transaction's kind and
    /// `InvariantViolation` when the post-commit audit fails. Both
    /// halt the worker; expected conditions never surface here.
    pub async fn index_block(&self, block: &Block) -> Result<(), IndexingError> {
        let _worker = self.worker.lock().await;
        info!(block = block.index, transactions = block.transactions.len(), "indexing block");

        for tx in &block.transactions {
            let kind = tx.kind();
            let Some(handler) = self.registry.get(kind) else {
                error!(%kind, "no handler for validated transaction");
                return Err(IndexingError::UnknownKind(kind));
            };

            handler.handle(tx, block.index).await?;
            murmur_telemetry::TRANSACTIONS_INDEXED.inc();

            if let Some(feed_id) = audited_group_target(&tx.payload) {
                audit::verify_group_invariants(self.store.as_ref(), feed_id).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{rig, validated};
    use shared_types::entities::{FeedId, GroupParticipantType};
    use shared_types::transactions::{JoinGroupFeedPayload, NewPersonalFeedPayload};

    #[tokio::test]
    async fn test_block_dispatch_in_order() {
        let rig = rig();
        let indexer = BlockIndexer::new(rig.ctx.clone());

        let group = FeedId::generate();
        rig.seed_group(group, &[("alice", GroupParticipantType::Admin)]).await;
        rig.register_identity("bob", "Bob");

        let personal = FeedId::generate();
        let block = Block {
            index: 10,
            transactions: vec![
                validated(
                    TransactionPayload::NewPersonalFeed(NewPersonalFeedPayload {
                        feed_id: personal,
                        encrypted_feed_key: vec![1],
                    }),
                    "bob",
                ),
                validated(
                    TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
                        feed_id: group,
                        invitation_token: None,
                    }),
                    "bob",
                ),
            ],
        };

        indexer.index_block(&block).await.unwrap();

        assert!(rig.store.get_feed(personal).await.unwrap().is_some());
        let stored = rig.store.get_group_feed(group).await.unwrap().unwrap();
        assert_eq!(stored.current_key_generation, 1);
        assert_eq!(stored.last_updated_at_block, 10);
    }

    #[tokio::test]
    async fn test_audit_passes_after_membership_block() {
        let rig = rig();
        let indexer = BlockIndexer::new(rig.ctx.clone());
        let group = FeedId::generate();
        rig.seed_group(group, &[("alice", GroupParticipantType::Admin)]).await;
        rig.register_identity("bob", "Bob");
        rig.register_identity("carol", "Carol");

        // Two joins in one block; the audit runs after each.
        let block = Block {
            index: 11,
            transactions: vec![
                validated(
                    TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
                        feed_id: group,
                        invitation_token: None,
                    }),
                    "bob",
                ),
                validated(
                    TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
                        feed_id: group,
                        invitation_token: None,
                    }),
                    "carol",
                ),
            ],
        };
        indexer.index_block(&block).await.unwrap();

        let stored = rig.store.get_group_feed(group).await.unwrap().unwrap();
        assert_eq!(stored.current_key_generation, 2);
    }
}
