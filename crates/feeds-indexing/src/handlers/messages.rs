//! Handlers for message kinds.
//!
//! The store insert is authoritative; the recent-messages cache is
//! write-through best effort, and the per-user metadata entries get
//! their `last_block_index` bumped.

use crate::context::HandlerContext;
use crate::errors::IndexingError;
use crate::handlers::TransactionHandler;
use async_trait::async_trait;
use shared_bus::FeedEvent;
use shared_types::entities::{BlockIndex, FeedMessage, PublicAddress};
use shared_types::transactions::{TransactionKind, TransactionPayload, ValidatedTransaction};
use std::sync::Arc;
use tracing::warn;

async fn index_message(
    ctx: &HandlerContext,
    message: FeedMessage,
    participants: Vec<PublicAddress>,
) -> Result<(), IndexingError> {
    if message.issuer_address.is_empty() {
        // The message stays, but nothing will ever attribute it.
        warn!(feed = %message.feed_id, message = %message.message_id, "message without issuer");
    }

    let feed_id = message.feed_id;
    let message_id = message.message_id;
    let block_index = message.block_index;

    match ctx.store.insert_message(message.clone()).await {
        Ok(()) => {}
        Err(feeds_store::StoreError::FeedNotFound(_)) => {
            warn!(feed = %feed_id, "message for unknown feed, skipping");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    murmur_telemetry::MESSAGES_STORED.inc();

    // Write-through, best effort.
    if let Err(e) = ctx.caches.recent_messages.push(&message).await {
        ctx.cache_warn("recent-messages", &e);
    }
    for user in &participants {
        if let Err(e) = ctx.caches.feed_metadata.touch(user, feed_id, block_index).await {
            ctx.cache_warn("feed-metadata", &e);
        }
    }

    ctx.bus
        .publish(FeedEvent::NewMessage {
            feed_id,
            message_id,
            block_index,
        })
        .await;
    Ok(())
}

/// `NewFeedMessage`: personal and chat feeds.
pub struct NewFeedMessageHandler {
    ctx: Arc<HandlerContext>,
}

impl NewFeedMessageHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for NewFeedMessageHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewFeedMessage
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::NewFeedMessage(payload) = &tx.payload else {
            warn!("NewFeedMessage handler received foreign payload");
            return Ok(());
        };

        let message = FeedMessage {
            message_id: payload.message_id,
            feed_id: payload.feed_id,
            ciphertext: payload.ciphertext.clone(),
            issuer_address: tx.user_signature.signatory.clone(),
            timestamp: payload.timestamp,
            block_index,
            reply_to: payload.reply_to,
            author_commitment: payload.author_commitment.clone(),
            key_generation: None,
        };
        let participants = self
            .ctx
            .store
            .list_feed_participants(payload.feed_id)
            .await?
            .iter()
            .map(|p| p.participant_address.clone())
            .collect();
        index_message(&self.ctx, message, participants).await
    }
}

/// `NewGroupFeedMessage`: group feeds; the payload's key generation is
/// stored with the message.
pub struct NewGroupFeedMessageHandler {
    ctx: Arc<HandlerContext>,
}

impl NewGroupFeedMessageHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for NewGroupFeedMessageHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewGroupFeedMessage
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::NewGroupFeedMessage(payload) = &tx.payload else {
            warn!("NewGroupFeedMessage handler received foreign payload");
            return Ok(());
        };

        let message = FeedMessage {
            message_id: payload.message_id,
            feed_id: payload.feed_id,
            ciphertext: payload.ciphertext.clone(),
            issuer_address: tx.user_signature.signatory.clone(),
            timestamp: payload.timestamp,
            block_index,
            reply_to: payload.reply_to,
            author_commitment: payload.author_commitment.clone(),
            key_generation: Some(payload.key_generation),
        };
        let participants = self
            .ctx
            .visible_participants(payload.feed_id)
            .await
            .iter()
            .map(|p| p.address.clone())
            .collect();
        index_message(&self.ctx, message, participants).await
    }
}
