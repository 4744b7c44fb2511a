//! Validators for message kinds.

use crate::context::{ValidationOutcome, ValidatorContext};
use crate::predicates;
use crate::validators::ContentValidator;
use async_trait::async_trait;
use shared_types::transactions::{SignedTransaction, TransactionKind, TransactionPayload};
use std::sync::Arc;

/// `NewFeedMessage` (personal/chat): the feed must exist and the author
/// commitment, when present, must be exactly 32 bytes.
pub struct NewFeedMessageValidator {
    ctx: Arc<ValidatorContext>,
}

impl NewFeedMessageValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for NewFeedMessageValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewFeedMessage
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::NewFeedMessage(payload) = &tx.payload else {
            return self.ctx.reject("NewFeedMessage", "payload kind mismatch");
        };
        if !predicates::author_commitment_ok(payload.author_commitment.as_ref()) {
            return self.ctx.reject("NewFeedMessage", "author commitment not 32 bytes");
        }
        match self.ctx.store.get_feed(payload.feed_id).await {
            Ok(Some(_)) => self.ctx.attach_signature(tx),
            _ => self.ctx.reject("NewFeedMessage", "feed does not exist"),
        }
    }
}

/// `NewGroupFeedMessage`: the group must be live and the message's key
/// generation must fall inside the acceptance window: the current
/// generation, or the previous one while the current epoch is younger
/// than the grace period.
pub struct NewGroupFeedMessageValidator {
    ctx: Arc<ValidatorContext>,
}

impl NewGroupFeedMessageValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for NewGroupFeedMessageValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewGroupFeedMessage
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::NewGroupFeedMessage(payload) = &tx.payload else {
            return self.ctx.reject("NewGroupFeedMessage", "payload kind mismatch");
        };
        if !predicates::author_commitment_ok(payload.author_commitment.as_ref()) {
            return self
                .ctx
                .reject("NewGroupFeedMessage", "author commitment not 32 bytes");
        }
        if predicates::live_group(self.ctx.store.as_ref(), payload.feed_id)
            .await
            .is_none()
        {
            return self
                .ctx
                .reject("NewGroupFeedMessage", "group missing or deleted");
        }

        let current = match self.ctx.store.get_current_key_generation(payload.feed_id).await {
            Ok(Some(generation)) => generation,
            _ => return self.ctx.reject("NewGroupFeedMessage", "no key generation"),
        };
        if !predicates::keygen_window_ok(
            &current,
            payload.key_generation,
            self.ctx.clock.last_block_index(),
            self.ctx.config.keygen_grace_period_blocks,
        ) {
            return self
                .ctx
                .reject("NewGroupFeedMessage", "key generation outside window");
        }

        self.ctx.attach_signature(tx)
    }
}
