//! # Content Validators
//!
//! One validator per transaction kind, all behind the same interface.
//! A validator either rejects or returns the transaction with the
//! validator signature attached; it never writes store state.

pub mod feeds;
pub mod keys;
pub mod membership;
pub mod messages;
pub mod moderation;

use crate::context::{ValidationOutcome, ValidatorContext};
use async_trait::async_trait;
use shared_types::transactions::{SignedTransaction, TransactionKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// The per-kind validation contract.
#[async_trait]
pub trait ContentValidator: Send + Sync {
    /// The single kind this validator accepts.
    fn kind(&self) -> TransactionKind;

    /// Enforce the kind's content rules. Rejection is a single boolean
    /// outcome; on success the same transaction comes back carrying the
    /// validator's signature.
    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome;
}

/// Function table over every kind, keyed by kind tag.
pub struct ValidatorRegistry {
    validators: HashMap<TransactionKind, Arc<dyn ContentValidator>>,
}

impl ValidatorRegistry {
    /// Build the registry with the default validator per kind.
    #[must_use]
    pub fn with_defaults(ctx: Arc<ValidatorContext>) -> Self {
        let all: Vec<Arc<dyn ContentValidator>> = vec![
            Arc::new(feeds::NewPersonalFeedValidator::new(ctx.clone())),
            Arc::new(feeds::NewChatFeedValidator::new(ctx.clone())),
            Arc::new(feeds::NewGroupFeedValidator::new(ctx.clone())),
            Arc::new(messages::NewFeedMessageValidator::new(ctx.clone())),
            Arc::new(messages::NewGroupFeedMessageValidator::new(ctx.clone())),
            Arc::new(membership::JoinGroupFeedValidator::new(ctx.clone())),
            Arc::new(membership::LeaveGroupFeedValidator::new(ctx.clone())),
            Arc::new(membership::AddMemberToGroupFeedValidator::new(ctx.clone())),
            Arc::new(moderation::BanFromGroupFeedValidator::new(ctx.clone())),
            Arc::new(moderation::UnbanFromGroupFeedValidator::new(ctx.clone())),
            Arc::new(moderation::BlockMemberValidator::new(ctx.clone())),
            Arc::new(moderation::UnblockMemberValidator::new(ctx.clone())),
            Arc::new(moderation::PromoteToAdminValidator::new(ctx.clone())),
            Arc::new(moderation::DeleteGroupFeedValidator::new(ctx.clone())),
            Arc::new(moderation::UpdateGroupFeedTitleValidator::new(ctx.clone())),
            Arc::new(moderation::UpdateGroupFeedDescriptionValidator::new(
                ctx.clone(),
            )),
            Arc::new(keys::GroupFeedKeyRotationValidator::new(ctx)),
        ];
        let validators = all.into_iter().map(|v| (v.kind(), v)).collect();
        Self { validators }
    }

    /// Dispatch a signed transaction to its kind's validator.
    pub async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let kind = tx.kind();
        match self.validators.get(&kind) {
            Some(validator) => validator.validate(tx).await,
            None => {
                // Unreachable with `with_defaults`; kept as a guard for
                // hand-built registries.
                warn!(%kind, "no content validator registered");
                ValidationOutcome::Rejected
            }
        }
    }

    /// Number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// True if no validators are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
