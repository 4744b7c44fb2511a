//! Validators for the self-affecting membership kinds and admin adds.

use crate::context::{ValidationOutcome, ValidatorContext};
use crate::predicates;
use crate::validators::ContentValidator;
use async_trait::async_trait;
use shared_types::transactions::{SignedTransaction, TransactionKind, TransactionPayload};
use std::sync::Arc;

/// `JoinGroupFeed`: the subject is the signatory. The group must be
/// live, private groups require an invitation token, the subject must
/// not already be an active or banned participant, and the rejoin
/// cooldown must have elapsed.
pub struct JoinGroupFeedValidator {
    ctx: Arc<ValidatorContext>,
}

impl JoinGroupFeedValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for JoinGroupFeedValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::JoinGroupFeed
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::JoinGroupFeed(payload) = &tx.payload else {
            return self.ctx.reject("JoinGroupFeed", "payload kind mismatch");
        };
        let subject = &tx.user_signature.signatory;

        let Some(group) = predicates::live_group(self.ctx.store.as_ref(), payload.feed_id).await
        else {
            return self.ctx.reject("JoinGroupFeed", "group missing or deleted");
        };

        if !group.is_public
            && payload
                .invitation_token
                .as_deref()
                .map_or(true, str::is_empty)
        {
            return self
                .ctx
                .reject("JoinGroupFeed", "private group requires invitation token");
        }

        let row =
            predicates::participant_row(self.ctx.store.as_ref(), payload.feed_id, subject).await;
        if !predicates::may_enter(row.as_ref()) {
            return self
                .ctx
                .reject("JoinGroupFeed", "subject already present or banned");
        }
        if !predicates::cooldown_elapsed(
            row.as_ref(),
            self.ctx.config.rejoin_cooldown_blocks,
            self.ctx.clock.last_block_index(),
        ) {
            return self.ctx.reject("JoinGroupFeed", "rejoin cooldown not elapsed");
        }

        self.ctx.attach_signature(tx)
    }
}

/// `LeaveGroupFeed`: the subject is the signatory and must currently be
/// an active participant of a live group.
pub struct LeaveGroupFeedValidator {
    ctx: Arc<ValidatorContext>,
}

impl LeaveGroupFeedValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for LeaveGroupFeedValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::LeaveGroupFeed
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::LeaveGroupFeed(payload) = &tx.payload else {
            return self.ctx.reject("LeaveGroupFeed", "payload kind mismatch");
        };
        let subject = &tx.user_signature.signatory;

        if predicates::live_group(self.ctx.store.as_ref(), payload.feed_id)
            .await
            .is_none()
        {
            return self.ctx.reject("LeaveGroupFeed", "group missing or deleted");
        }

        let row =
            predicates::participant_row(self.ctx.store.as_ref(), payload.feed_id, subject).await;
        match row {
            Some(p) if p.is_active() => self.ctx.attach_signature(tx),
            _ => self.ctx.reject("LeaveGroupFeed", "subject is not an active participant"),
        }
    }
}

/// `AddMemberToGroupFeed`: like a join, but authorized by an admin
/// signatory and carrying the new member's encryption address. No
/// cooldown applies to admin adds.
pub struct AddMemberToGroupFeedValidator {
    ctx: Arc<ValidatorContext>,
}

impl AddMemberToGroupFeedValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for AddMemberToGroupFeedValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::AddMemberToGroupFeed
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::AddMemberToGroupFeed(payload) = &tx.payload else {
            return self.ctx.reject("AddMemberToGroupFeed", "payload kind mismatch");
        };

        if payload.member_address.is_empty() {
            return self.ctx.reject("AddMemberToGroupFeed", "empty member address");
        }
        if payload.member_encrypt_address.is_empty() {
            return self
                .ctx
                .reject("AddMemberToGroupFeed", "empty member encryption address");
        }

        if predicates::live_group(self.ctx.store.as_ref(), payload.feed_id)
            .await
            .is_none()
        {
            return self
                .ctx
                .reject("AddMemberToGroupFeed", "group missing or deleted");
        }
        if !predicates::is_active_admin(
            self.ctx.store.as_ref(),
            payload.feed_id,
            &tx.user_signature.signatory,
        )
        .await
        {
            return self.ctx.reject("AddMemberToGroupFeed", "signatory is not an admin");
        }

        let row = predicates::participant_row(
            self.ctx.store.as_ref(),
            payload.feed_id,
            &payload.member_address,
        )
        .await;
        if !predicates::may_enter(row.as_ref()) {
            return self
                .ctx
                .reject("AddMemberToGroupFeed", "member already present or banned");
        }

        self.ctx.attach_signature(tx)
    }
}
