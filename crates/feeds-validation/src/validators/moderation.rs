//! Validators for the admin-only moderation and metadata kinds.

use crate::context::{ValidationOutcome, ValidatorContext};
use crate::predicates;
use crate::validators::ContentValidator;
use async_trait::async_trait;
use shared_types::entities::{FeedId, GroupParticipantType, PublicAddress};
use shared_types::transactions::{SignedTransaction, TransactionKind, TransactionPayload};
use std::sync::Arc;

/// The gate every admin action passes first: the group is live and the
/// signatory currently holds the Admin role in it.
async fn admin_gate(ctx: &ValidatorContext, feed_id: FeedId, signatory: &PublicAddress) -> bool {
    predicates::live_group(ctx.store.as_ref(), feed_id)
        .await
        .is_some()
        && predicates::is_active_admin(ctx.store.as_ref(), feed_id, signatory).await
}

/// Does the target currently sit in one of `allowed` states (and has
/// not left)?
async fn target_in_state(
    ctx: &ValidatorContext,
    feed_id: FeedId,
    target: &PublicAddress,
    allowed: &[GroupParticipantType],
) -> bool {
    match predicates::participant_row(ctx.store.as_ref(), feed_id, target).await {
        Some(p) => p.is_active() && allowed.contains(&p.participant_type),
        None => false,
    }
}

macro_rules! moderation_validator {
    ($name:ident, $kind:ident, $allowed:expr, $doc:literal) => {
        #[doc = $doc]
        pub struct $name {
            ctx: Arc<ValidatorContext>,
        }

        impl $name {
            /// Wire up the validator.
            pub fn new(ctx: Arc<ValidatorContext>) -> Self {
                Self { ctx }
            }
        }

        #[async_trait]
        impl ContentValidator for $name {
            fn kind(&self) -> TransactionKind {
                TransactionKind::$kind
            }

            async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
                let TransactionPayload::$kind(payload) = &tx.payload else {
                    return self.ctx.reject(stringify!($kind), "payload kind mismatch");
                };
                if !admin_gate(&self.ctx, payload.feed_id, &tx.user_signature.signatory).await {
                    return self
                        .ctx
                        .reject(stringify!($kind), "not a live group or signatory not admin");
                }
                if !target_in_state(
                    &self.ctx,
                    payload.feed_id,
                    &payload.member_address,
                    &$allowed,
                )
                .await
                {
                    return self
                        .ctx
                        .reject(stringify!($kind), "target in incompatible state");
                }
                self.ctx.attach_signature(tx)
            }
        }
    };
}

moderation_validator!(
    BanFromGroupFeedValidator,
    BanFromGroupFeed,
    [GroupParticipantType::Member, GroupParticipantType::Blocked],
    "`BanFromGroupFeed`: admin only; the target must currently be a Member or Blocked."
);

moderation_validator!(
    UnbanFromGroupFeedValidator,
    UnbanFromGroupFeed,
    [GroupParticipantType::Banned],
    "`UnbanFromGroupFeed`: admin only; the target must currently be Banned."
);

moderation_validator!(
    BlockMemberValidator,
    BlockMember,
    [GroupParticipantType::Member],
    "`BlockMember`: admin only; the target must currently be a Member."
);

moderation_validator!(
    UnblockMemberValidator,
    UnblockMember,
    [GroupParticipantType::Blocked],
    "`UnblockMember`: admin only; the target must currently be Blocked."
);

moderation_validator!(
    PromoteToAdminValidator,
    PromoteToAdmin,
    [GroupParticipantType::Member],
    "`PromoteToAdmin`: admin only; the target must currently be a Member."
);

/// `DeleteGroupFeed`: only the sole remaining admin may dissolve the
/// group.
pub struct DeleteGroupFeedValidator {
    ctx: Arc<ValidatorContext>,
}

impl DeleteGroupFeedValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for DeleteGroupFeedValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::DeleteGroupFeed
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::DeleteGroupFeed(payload) = &tx.payload else {
            return self.ctx.reject("DeleteGroupFeed", "payload kind mismatch");
        };
        if !admin_gate(&self.ctx, payload.feed_id, &tx.user_signature.signatory).await {
            return self
                .ctx
                .reject("DeleteGroupFeed", "not a live group or signatory not admin");
        }
        match self.ctx.store.count_admins(payload.feed_id).await {
            Ok(1) => self.ctx.attach_signature(tx),
            Ok(n) => self.ctx.reject(
                "DeleteGroupFeed",
                &format!("{n} admins remain, only the last may dissolve"),
            ),
            Err(_) => self.ctx.reject("DeleteGroupFeed", "admin count unavailable"),
        }
    }
}

/// `UpdateGroupFeedTitle`: admin only; the new title obeys the same
/// bounds as at creation.
pub struct UpdateGroupFeedTitleValidator {
    ctx: Arc<ValidatorContext>,
}

impl UpdateGroupFeedTitleValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for UpdateGroupFeedTitleValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::UpdateGroupFeedTitle
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::UpdateGroupFeedTitle(payload) = &tx.payload else {
            return self.ctx.reject("UpdateGroupFeedTitle", "payload kind mismatch");
        };
        if !predicates::title_ok(&payload.title, self.ctx.config.max_title_length) {
            return self.ctx.reject("UpdateGroupFeedTitle", "bad title");
        }
        if !admin_gate(&self.ctx, payload.feed_id, &tx.user_signature.signatory).await {
            return self
                .ctx
                .reject("UpdateGroupFeedTitle", "not a live group or signatory not admin");
        }
        self.ctx.attach_signature(tx)
    }
}

/// `UpdateGroupFeedDescription`: admin only; the description may be
/// empty.
pub struct UpdateGroupFeedDescriptionValidator {
    ctx: Arc<ValidatorContext>,
}

impl UpdateGroupFeedDescriptionValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for UpdateGroupFeedDescriptionValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::UpdateGroupFeedDescription
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::UpdateGroupFeedDescription(payload) = &tx.payload else {
            return self
                .ctx
                .reject("UpdateGroupFeedDescription", "payload kind mismatch");
        };
        if !admin_gate(&self.ctx, payload.feed_id, &tx.user_signature.signatory).await {
            return self.ctx.reject(
                "UpdateGroupFeedDescription",
                "not a live group or signatory not admin",
            );
        }
        self.ctx.attach_signature(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::testutil::{rig, seed_group, signed};
    use feeds_store::FeedsStore;
    use shared_types::transactions::{
        DeleteGroupFeedPayload, GroupModerationPayload, UpdateGroupFeedTitlePayload,
    };

    fn moderation(feed_id: FeedId, target: &str) -> GroupModerationPayload {
        GroupModerationPayload {
            feed_id,
            member_address: target.to_string(),
        }
    }

    async fn seeded(
        rig: &crate::validators::testutil::TestRig,
        members: &[(&str, GroupParticipantType)],
    ) -> FeedId {
        let feed_id = FeedId::generate();
        seed_group(&rig.store, feed_id, true, members).await;
        feed_id
    }

    #[tokio::test]
    async fn test_ban_targets_member_or_blocked() {
        let rig = rig();
        let feed_id = seeded(
            &rig,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
                ("carol", GroupParticipantType::Blocked),
                ("mallory", GroupParticipantType::Banned),
            ],
        )
        .await;
        let validator = BanFromGroupFeedValidator::new(rig.ctx);

        for target in ["bob", "carol"] {
            assert!(validator
                .validate(signed(
                    TransactionPayload::BanFromGroupFeed(moderation(feed_id, target)),
                    "alice"
                ))
                .await
                .is_validated());
        }
        // Already banned, and admins cannot be banned.
        for target in ["mallory", "alice"] {
            assert!(!validator
                .validate(signed(
                    TransactionPayload::BanFromGroupFeed(moderation(feed_id, target)),
                    "alice"
                ))
                .await
                .is_validated());
        }
    }

    #[tokio::test]
    async fn test_moderation_requires_admin_signatory() {
        let rig = rig();
        let feed_id = seeded(
            &rig,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
                ("carol", GroupParticipantType::Member),
            ],
        )
        .await;
        let validator = BanFromGroupFeedValidator::new(rig.ctx);

        assert!(!validator
            .validate(signed(
                TransactionPayload::BanFromGroupFeed(moderation(feed_id, "carol")),
                "bob"
            ))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_unban_requires_banned_target() {
        let rig = rig();
        let feed_id = seeded(
            &rig,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
                ("mallory", GroupParticipantType::Banned),
            ],
        )
        .await;
        let validator = UnbanFromGroupFeedValidator::new(rig.ctx);

        assert!(validator
            .validate(signed(
                TransactionPayload::UnbanFromGroupFeed(moderation(feed_id, "mallory")),
                "alice"
            ))
            .await
            .is_validated());
        assert!(!validator
            .validate(signed(
                TransactionPayload::UnbanFromGroupFeed(moderation(feed_id, "bob")),
                "alice"
            ))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_block_unblock_promote_state_machine() {
        let rig = rig();
        let feed_id = seeded(
            &rig,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
                ("carol", GroupParticipantType::Blocked),
            ],
        )
        .await;

        let block = BlockMemberValidator::new(rig.ctx.clone());
        assert!(block
            .validate(signed(
                TransactionPayload::BlockMember(moderation(feed_id, "bob")),
                "alice"
            ))
            .await
            .is_validated());
        assert!(!block
            .validate(signed(
                TransactionPayload::BlockMember(moderation(feed_id, "carol")),
                "alice"
            ))
            .await
            .is_validated());

        let unblock = UnblockMemberValidator::new(rig.ctx.clone());
        assert!(unblock
            .validate(signed(
                TransactionPayload::UnblockMember(moderation(feed_id, "carol")),
                "alice"
            ))
            .await
            .is_validated());
        assert!(!unblock
            .validate(signed(
                TransactionPayload::UnblockMember(moderation(feed_id, "bob")),
                "alice"
            ))
            .await
            .is_validated());

        let promote = PromoteToAdminValidator::new(rig.ctx);
        assert!(promote
            .validate(signed(
                TransactionPayload::PromoteToAdmin(moderation(feed_id, "bob")),
                "alice"
            ))
            .await
            .is_validated());
        assert!(!promote
            .validate(signed(
                TransactionPayload::PromoteToAdmin(moderation(feed_id, "carol")),
                "alice"
            ))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_delete_requires_sole_admin() {
        let rig = rig();
        let feed_id = seeded(
            &rig,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Admin),
            ],
        )
        .await;
        let validator = DeleteGroupFeedValidator::new(rig.ctx.clone());
        let delete = TransactionPayload::DeleteGroupFeed(DeleteGroupFeedPayload { feed_id });

        // Two admins: nobody may dissolve.
        assert!(!validator
            .validate(signed(delete.clone(), "alice"))
            .await
            .is_validated());

        // Demote bob out of the admin set; alice becomes the sole admin.
        let mut bob = rig
            .store
            .get_group_participant(feed_id, &"bob".to_string())
            .await
            .unwrap()
            .unwrap();
        bob.participant_type = GroupParticipantType::Member;
        rig.store.upsert_group_participant(bob).await.unwrap();

        assert!(validator
            .validate(signed(delete, "alice"))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_title_update_bounds() {
        let rig = rig();
        let feed_id = seeded(&rig, &[("alice", GroupParticipantType::Admin)]).await;
        let validator = UpdateGroupFeedTitleValidator::new(rig.ctx);

        let ok = TransactionPayload::UpdateGroupFeedTitle(UpdateGroupFeedTitlePayload {
            feed_id,
            title: "New title".to_string(),
        });
        assert!(validator.validate(signed(ok, "alice")).await.is_validated());

        let empty = TransactionPayload::UpdateGroupFeedTitle(UpdateGroupFeedTitlePayload {
            feed_id,
            title: String::new(),
        });
        assert!(!validator
            .validate(signed(empty, "alice"))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_deleted_group_rejects_admin_actions() {
        let rig = rig();
        let feed_id = seeded(&rig, &[("alice", GroupParticipantType::Admin)]).await;
        rig.store.set_group_deleted(feed_id, 5).await.unwrap();

        let validator = UpdateGroupFeedTitleValidator::new(rig.ctx);
        let update = TransactionPayload::UpdateGroupFeedTitle(UpdateGroupFeedTitlePayload {
            feed_id,
            title: "Too late".to_string(),
        });
        assert!(!validator
            .validate(signed(update, "alice"))
            .await
            .is_validated());
    }
}
