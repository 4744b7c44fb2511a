//! # Transaction Handlers
//!
//! One handler per kind behind a common interface, collected into a
//! function table keyed by kind tag. A handler consumes a validated
//! transaction and mutates store and caches in its prescribed order;
//! expected conditions are no-ops, only fatal conditions error.

pub mod feeds;
pub mod keys;
pub mod membership;
pub mod messages;
pub mod moderation;

use crate::context::HandlerContext;
use crate::errors::IndexingError;
use async_trait::async_trait;
use shared_types::entities::BlockIndex;
use shared_types::transactions::{TransactionKind, ValidatedTransaction};
use std::collections::HashMap;
use std::sync::Arc;

/// The per-kind indexing contract.
#[async_trait]
pub trait TransactionHandler: Send + Sync {
    /// The single kind this handler indexes.
    fn kind(&self) -> TransactionKind;

    /// Does this handler claim `kind`? Exactly one handler answers yes
    /// per kind.
    fn can_handle(&self, kind: TransactionKind) -> bool {
        kind == self.kind()
    }

    /// Apply the transaction's effects at `block_index`.
    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError>;
}

/// Function table over every kind, keyed by kind tag.
pub struct HandlerRegistry {
    handlers: HashMap<TransactionKind, Arc<dyn TransactionHandler>>,
}

impl HandlerRegistry {
    /// Build the registry with the default handler per kind.
    #[must_use]
    pub fn with_defaults(ctx: Arc<HandlerContext>) -> Self {
        let all: Vec<Arc<dyn TransactionHandler>> = vec![
            Arc::new(feeds::NewPersonalFeedHandler::new(ctx.clone())),
            Arc::new(feeds::NewChatFeedHandler::new(ctx.clone())),
            Arc::new(feeds::NewGroupFeedHandler::new(ctx.clone())),
            Arc::new(messages::NewFeedMessageHandler::new(ctx.clone())),
            Arc::new(messages::NewGroupFeedMessageHandler::new(ctx.clone())),
            Arc::new(membership::JoinGroupFeedHandler::new(ctx.clone())),
            Arc::new(membership::LeaveGroupFeedHandler::new(ctx.clone())),
            Arc::new(membership::AddMemberToGroupFeedHandler::new(ctx.clone())),
            Arc::new(moderation::BanFromGroupFeedHandler::new(ctx.clone())),
            Arc::new(moderation::UnbanFromGroupFeedHandler::new(ctx.clone())),
            Arc::new(moderation::BlockMemberHandler::new(ctx.clone())),
            Arc::new(moderation::UnblockMemberHandler::new(ctx.clone())),
            Arc::new(moderation::PromoteToAdminHandler::new(ctx.clone())),
            Arc::new(moderation::DeleteGroupFeedHandler::new(ctx.clone())),
            Arc::new(moderation::UpdateGroupFeedTitleHandler::new(ctx.clone())),
            Arc::new(moderation::UpdateGroupFeedDescriptionHandler::new(
                ctx.clone(),
            )),
            Arc::new(keys::GroupFeedKeyRotationHandler::new(ctx)),
        ];
        let handlers = all.into_iter().map(|h| (h.kind(), h)).collect();
        Self { handlers }
    }

    /// The unique handler for `kind`, if registered.
    #[must_use]
    pub fn get(&self, kind: TransactionKind) -> Option<&Arc<dyn TransactionHandler>> {
        self.handlers.get(&kind)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
