//! Handler for explicit key rotation transactions.

use crate::context::HandlerContext;
use crate::errors::IndexingError;
use crate::handlers::TransactionHandler;
use async_trait::async_trait;
use shared_bus::FeedEvent;
use shared_types::entities::{BlockIndex, EncryptedMemberKey, KeyGeneration};
use shared_types::transactions::{TransactionKind, TransactionPayload, ValidatedTransaction};
use std::sync::Arc;
use tracing::warn;

/// `GroupFeedKeyRotation`: persist the epoch and its member keys
/// atomically with the group's current-generation pointer, then emit
/// the completion event carrying the keyed member list.
pub struct GroupFeedKeyRotationHandler {
    ctx: Arc<HandlerContext>,
}

impl GroupFeedKeyRotationHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for GroupFeedKeyRotationHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::GroupFeedKeyRotation
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        _block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::GroupFeedKeyRotation(payload) = &tx.payload else {
            warn!("GroupFeedKeyRotation handler received foreign payload");
            return Ok(());
        };
        let feed_id = payload.feed_id;

        let generation = KeyGeneration {
            feed_id,
            generation: payload.new_generation,
            valid_from_block: payload.valid_from_block,
            valid_to_block: None,
            trigger: payload.trigger,
        };
        let keys: Vec<EncryptedMemberKey> = payload
            .encrypted_keys
            .iter()
            .map(|slot| EncryptedMemberKey {
                feed_id,
                generation: payload.new_generation,
                member_address: slot.member_address.clone(),
                encrypted_aes_key: slot.encrypted_aes_key.clone(),
            })
            .collect();
        let members: Vec<_> = keys.iter().map(|k| k.member_address.clone()).collect();

        match self.ctx.store.persist_key_generation(generation, keys).await {
            Ok(()) => {}
            Err(feeds_store::StoreError::Conflict(reason)) => {
                // A stale rotation (replayed or raced) leaves the epoch
                // sequence untouched.
                warn!(feed = %feed_id, reason, "stale key rotation, skipping");
                return Ok(());
            }
            Err(feeds_store::StoreError::GroupNotFound(_)) => {
                warn!(feed = %feed_id, "rotation for unknown group, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        // Rotation invalidates the derived key views; membership may
        // have changed with it.
        if let Err(e) = self.ctx.caches.key_generations.invalidate(feed_id).await {
            self.ctx.cache_warn("key-generations", &e);
        }
        if let Err(e) = self.ctx.caches.participants.invalidate(feed_id).await {
            self.ctx.cache_warn("participants", &e);
        }
        self.ctx.refresh_group_metadata(feed_id).await;

        self.ctx
            .bus
            .publish(FeedEvent::KeyRotationCompleted {
                feed_id,
                generation: payload.new_generation,
                members,
            })
            .await;
        Ok(())
    }
}
