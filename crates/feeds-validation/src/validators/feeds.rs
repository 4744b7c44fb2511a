//! Validators for feed creation kinds.

use crate::context::{ValidationOutcome, ValidatorContext};
use crate::predicates;
use crate::validators::ContentValidator;
use async_trait::async_trait;
use shared_types::transactions::{SignedTransaction, TransactionKind, TransactionPayload};
use std::collections::HashSet;
use std::sync::Arc;

/// `NewPersonalFeed`: the creator is the signatory; the store's
/// conditional insert absorbs duplicates, so content validation only
/// needs a signatory at all.
pub struct NewPersonalFeedValidator {
    ctx: Arc<ValidatorContext>,
}

impl NewPersonalFeedValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for NewPersonalFeedValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewPersonalFeed
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::NewPersonalFeed(_) = &tx.payload else {
            return self.ctx.reject("NewPersonalFeed", "payload kind mismatch");
        };
        if tx.user_signature.signatory.is_empty() {
            return self.ctx.reject("NewPersonalFeed", "empty signatory");
        }
        self.ctx.attach_signature(tx)
    }
}

/// `NewChatFeed`: exactly two distinct participants, each with a
/// non-empty wrapped key.
pub struct NewChatFeedValidator {
    ctx: Arc<ValidatorContext>,
}

impl NewChatFeedValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for NewChatFeedValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewChatFeed
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::NewChatFeed(payload) = &tx.payload else {
            return self.ctx.reject("NewChatFeed", "payload kind mismatch");
        };

        if payload.participants.len() != 2 {
            return self.ctx.reject("NewChatFeed", "chat needs exactly 2 participants");
        }
        let addresses: Vec<_> = payload
            .participants
            .iter()
            .map(|p| p.address.clone())
            .collect();
        if !predicates::addresses_distinct_and_nonempty(&addresses) {
            return self.ctx.reject("NewChatFeed", "bad participant addresses");
        }
        if payload
            .participants
            .iter()
            .any(|p| p.encrypted_feed_key.is_empty())
        {
            return self.ctx.reject("NewChatFeed", "empty wrapped feed key");
        }
        self.ctx.attach_signature(tx)
    }
}

/// `NewGroupFeed`: bounded non-empty title, a participant set that
/// includes the creator, and a genesis key wrap for exactly that set.
pub struct NewGroupFeedValidator {
    ctx: Arc<ValidatorContext>,
}

impl NewGroupFeedValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for NewGroupFeedValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewGroupFeed
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::NewGroupFeed(payload) = &tx.payload else {
            return self.ctx.reject("NewGroupFeed", "payload kind mismatch");
        };

        if !predicates::title_ok(&payload.title, self.ctx.config.max_title_length) {
            return self.ctx.reject("NewGroupFeed", "bad title");
        }
        if payload.participants.is_empty() {
            return self.ctx.reject("NewGroupFeed", "no participants");
        }
        if !payload
            .participants
            .contains(&tx.user_signature.signatory)
        {
            return self.ctx.reject("NewGroupFeed", "creator not among participants");
        }
        if !predicates::addresses_distinct_and_nonempty(&payload.participants) {
            return self.ctx.reject("NewGroupFeed", "bad participant addresses");
        }
        if !predicates::encrypted_keys_ok(&payload.encrypted_keys) {
            return self.ctx.reject("NewGroupFeed", "bad genesis key wraps");
        }

        // Genesis wraps must cover exactly the initial participant set.
        let wrapped: HashSet<&str> = payload
            .encrypted_keys
            .iter()
            .map(|k| k.member_address.as_str())
            .collect();
        let participants: HashSet<&str> =
            payload.participants.iter().map(String::as_str).collect();
        if wrapped != participants {
            return self
                .ctx
                .reject("NewGroupFeed", "genesis wraps do not match participants");
        }

        self.ctx.attach_signature(tx)
    }
}
