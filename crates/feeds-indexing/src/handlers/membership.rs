//! Handlers for join, admin add and leave.
//!
//! Join ordering contract: store mutation, rotation persist, key-gen
//! cache invalidation, participants cache update, group last-updated
//! bump and metadata refresh all complete before the handler returns;
//! only the membership event is fire-and-forget.

use crate::context::HandlerContext;
use crate::errors::IndexingError;
use crate::handlers::TransactionHandler;
use async_trait::async_trait;
use feeds_keyring::JoiningMember;
use shared_bus::FeedEvent;
use shared_types::entities::{
    BlockIndex, FeedId, GroupFeedParticipant, GroupParticipantType, PublicAddress,
    RotationTrigger,
};
use shared_types::transactions::{TransactionKind, TransactionPayload, ValidatedTransaction};
use std::sync::Arc;
use tracing::{error, warn};

/// The shared entry path for joins and admin adds.
async fn admit_member(
    ctx: &HandlerContext,
    feed_id: FeedId,
    subject: &PublicAddress,
    encrypt_address: Option<String>,
    block_index: BlockIndex,
) -> Result<(), IndexingError> {
    // Store mutation first: a returning member's row is updated in
    // place, preserving last_leave_block; a new member gets a fresh row.
    let participant = match ctx.store.get_group_participant(feed_id, subject).await? {
        Some(existing) if existing.is_active() => {
            warn!(feed = %feed_id, subject = %subject, "already an active participant, skipping");
            return Ok(());
        }
        Some(mut returning) => {
            returning.left_at_block = None;
            returning.participant_type = GroupParticipantType::Member;
            returning.joined_at_block = block_index;
            returning
        }
        None => GroupFeedParticipant {
            feed_id,
            address: subject.clone(),
            participant_type: GroupParticipantType::Member,
            joined_at_block: block_index,
            left_at_block: None,
            last_leave_block: None,
        },
    };
    match ctx.store.upsert_group_participant(participant).await {
        Ok(()) => {}
        Err(feeds_store::StoreError::GroupNotFound(_)) => {
            warn!(feed = %feed_id, subject = %subject, "join for unknown group, skipping");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    // Rotation persist. On failure the group stays at its previous
    // generation and no success event fires.
    let rotated = ctx
        .keyring
        .rotate_and_persist(
            feed_id,
            RotationTrigger::Join,
            Some(JoiningMember {
                address: subject.clone(),
                encrypt_address,
            }),
            None,
            block_index,
        )
        .await;
    if let Err(e) = rotated {
        error!(feed = %feed_id, subject = %subject, error = %e, "join rotation failed");
    }

    // Synchronous cache sequence; a client querying right after the
    // join must already see it.
    if let Err(e) = ctx.caches.key_generations.invalidate(feed_id).await {
        ctx.cache_warn("key-generations", &e);
    }
    if let Err(e) = ctx.caches.participants.add(feed_id, subject).await {
        ctx.cache_warn("participants", &e);
    }
    ctx.store.touch_group(feed_id, block_index).await?;
    if let Err(e) = ctx.caches.user_feeds.add(subject, feed_id).await {
        ctx.cache_warn("user-feeds", &e);
    }
    ctx.refresh_group_metadata(feed_id).await;

    // Fire-and-forget.
    ctx.bus
        .publish(FeedEvent::UserJoined {
            feed_id,
            address: subject.clone(),
            block_index,
        })
        .await;
    Ok(())
}

/// `JoinGroupFeed`: the subject is the signatory.
pub struct JoinGroupFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl JoinGroupFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for JoinGroupFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::JoinGroupFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::JoinGroupFeed(payload) = &tx.payload else {
            warn!("JoinGroupFeed handler received foreign payload");
            return Ok(());
        };
        admit_member(
            &self.ctx,
            payload.feed_id,
            &tx.user_signature.signatory,
            None,
            block_index,
        )
        .await
    }
}

/// `AddMemberToGroupFeed`: join semantics with an admin signatory; the
/// payload carries the new member's encryption address.
pub struct AddMemberToGroupFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl AddMemberToGroupFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for AddMemberToGroupFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::AddMemberToGroupFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::AddMemberToGroupFeed(payload) = &tx.payload else {
            warn!("AddMemberToGroupFeed handler received foreign payload");
            return Ok(());
        };
        admit_member(
            &self.ctx,
            payload.feed_id,
            &payload.member_address,
            Some(payload.member_encrypt_address.clone()),
            block_index,
        )
        .await
    }
}

/// `LeaveGroupFeed`: a leaving sole admin dissolves the group (soft
/// delete, no rotation); anyone else is marked left and triggers a
/// rotation without them.
pub struct LeaveGroupFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl LeaveGroupFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for LeaveGroupFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::LeaveGroupFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::LeaveGroupFeed(payload) = &tx.payload else {
            warn!("LeaveGroupFeed handler received foreign payload");
            return Ok(());
        };
        let subject = &tx.user_signature.signatory;
        let feed_id = payload.feed_id;

        let Some(mut participant) = self.ctx.store.get_group_participant(feed_id, subject).await?
        else {
            warn!(feed = %feed_id, subject = %subject, "leave without participant row, skipping");
            return Ok(());
        };
        if !participant.is_active() {
            warn!(feed = %feed_id, subject = %subject, "leave of inactive participant, skipping");
            return Ok(());
        }

        let sole_admin = participant.participant_type == GroupParticipantType::Admin
            && self.ctx.store.count_admins(feed_id).await? == 1;

        if sole_admin {
            // Last admin out dissolves the group; history survives, no
            // rotation happens.
            self.ctx.store.set_group_deleted(feed_id, block_index).await?;
        } else {
            participant.left_at_block = Some(block_index);
            participant.last_leave_block = Some(block_index);
            self.ctx.store.upsert_group_participant(participant).await?;

            let rotated = self
                .ctx
                .keyring
                .rotate_and_persist(
                    feed_id,
                    RotationTrigger::Leave,
                    None,
                    Some(subject),
                    block_index,
                )
                .await;
            if let Err(e) = rotated {
                error!(feed = %feed_id, subject = %subject, error = %e, "leave rotation failed");
            }

            if let Err(e) = self.ctx.caches.key_generations.invalidate(feed_id).await {
                self.ctx.cache_warn("key-generations", &e);
            }
            if let Err(e) = self.ctx.caches.participants.remove(feed_id, subject).await {
                self.ctx.cache_warn("participants", &e);
            }
            self.ctx.store.touch_group(feed_id, block_index).await?;
            self.ctx.refresh_group_metadata(feed_id).await;
        }

        if let Err(e) = self.ctx.caches.user_feeds.remove(subject, feed_id).await {
            self.ctx.cache_warn("user-feeds", &e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{rig, validated};
    use feeds_store::FeedsStore;
    use shared_types::transactions::{JoinGroupFeedPayload, LeaveGroupFeedPayload};

    fn join(feed_id: FeedId) -> TransactionPayload {
        TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
            feed_id,
            invitation_token: None,
        })
    }

    fn leave(feed_id: FeedId) -> TransactionPayload {
        TransactionPayload::LeaveGroupFeed(LeaveGroupFeedPayload { feed_id })
    }

    #[tokio::test]
    async fn test_join_creates_member_and_rotates() {
        let rig = rig();
        let feed_id = FeedId::generate();
        rig.seed_group(
            feed_id,
            &[
                ("alice", GroupParticipantType::Admin),
                ("charlie", GroupParticipantType::Member),
            ],
        )
        .await;
        rig.register_identity("bob", "Bob");

        let handler = JoinGroupFeedHandler::new(rig.ctx.clone());
        handler.handle(&validated(join(feed_id), "bob"), 10).await.unwrap();

        let bob = rig
            .store
            .get_group_participant(feed_id, &"bob".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.participant_type, GroupParticipantType::Member);
        assert_eq!(bob.joined_at_block, 10);
        assert!(bob.is_active());

        let group = rig.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.current_key_generation, 1);
        assert_eq!(group.last_updated_at_block, 10);

        let keys = rig.store.list_encrypted_member_keys(feed_id, 1).await.unwrap();
        let mut wrapped: Vec<_> = keys.iter().map(|k| k.member_address.clone()).collect();
        wrapped.sort();
        assert_eq!(wrapped, vec!["alice", "bob", "charlie"]);
    }

    #[tokio::test]
    async fn test_rejoin_updates_row_in_place() {
        let rig = rig();
        let feed_id = FeedId::generate();
        rig.seed_group(
            feed_id,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
            ],
        )
        .await;

        let leave_handler = LeaveGroupFeedHandler::new(rig.ctx.clone());
        leave_handler
            .handle(&validated(leave(feed_id), "bob"), 50)
            .await
            .unwrap();

        let join_handler = JoinGroupFeedHandler::new(rig.ctx.clone());
        join_handler
            .handle(&validated(join(feed_id), "bob"), 150)
            .await
            .unwrap();

        let rows = rig.store.list_group_participants(feed_id).await.unwrap();
        let bob_rows: Vec<_> = rows.iter().filter(|p| p.address == "bob").collect();
        // One row, updated in place.
        assert_eq!(bob_rows.len(), 1);
        assert!(bob_rows[0].is_active());
        assert_eq!(bob_rows[0].joined_at_block, 150);
        // The leave block survives the rejoin.
        assert_eq!(bob_rows[0].last_leave_block, Some(50));

        // Join, leave, join: three rotations on top of genesis.
        let generations = rig.store.list_key_generations(feed_id).await.unwrap();
        assert_eq!(generations.len(), 3);
    }

    #[tokio::test]
    async fn test_leave_rotates_without_subject() {
        let rig = rig();
        let feed_id = FeedId::generate();
        rig.seed_group(
            feed_id,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
            ],
        )
        .await;

        let handler = LeaveGroupFeedHandler::new(rig.ctx.clone());
        handler.handle(&validated(leave(feed_id), "bob"), 20).await.unwrap();

        let keys = rig.store.list_encrypted_member_keys(feed_id, 1).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].member_address, "alice");
    }

    #[tokio::test]
    async fn test_sole_admin_leave_dissolves_group() {
        let rig = rig();
        let feed_id = FeedId::generate();
        rig.seed_group(
            feed_id,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
            ],
        )
        .await;

        let handler = LeaveGroupFeedHandler::new(rig.ctx.clone());
        handler.handle(&validated(leave(feed_id), "alice"), 30).await.unwrap();

        let group = rig.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert!(group.is_deleted);
        // Dissolution skips rotation.
        assert_eq!(group.current_key_generation, 0);
        // Rows survive the soft delete.
        assert_eq!(
            rig.store.list_group_participants(feed_id).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_admin_leave_with_other_admins_rotates() {
        let rig = rig();
        let feed_id = FeedId::generate();
        rig.seed_group(
            feed_id,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Admin),
            ],
        )
        .await;

        let handler = LeaveGroupFeedHandler::new(rig.ctx.clone());
        handler.handle(&validated(leave(feed_id), "alice"), 30).await.unwrap();

        let group = rig.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert!(!group.is_deleted);
        assert_eq!(group.current_key_generation, 1);
    }

    #[tokio::test]
    async fn test_add_member_uses_payload_encrypt_address() {
        let rig = rig();
        let feed_id = FeedId::generate();
        rig.seed_group(feed_id, &[("alice", GroupParticipantType::Admin)]).await;

        // Dora is NOT in the identity directory; the payload-supplied
        // encryption address must carry the rotation.
        let dora_pair = shared_crypto::ecies::EncryptionKeyPair::generate();
        let handler = AddMemberToGroupFeedHandler::new(rig.ctx.clone());
        handler
            .handle(
                &validated(
                    TransactionPayload::AddMemberToGroupFeed(
                        shared_types::transactions::AddMemberToGroupFeedPayload {
                            feed_id,
                            member_address: "dora".to_string(),
                            member_encrypt_address: dora_pair.public_address(),
                        },
                    ),
                    "alice",
                ),
                12,
            )
            .await
            .unwrap();

        let group = rig.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.current_key_generation, 1);
        let keys = rig.store.list_encrypted_member_keys(feed_id, 1).await.unwrap();
        assert!(keys.iter().any(|k| k.member_address == "dora"));
    }

    #[tokio::test]
    async fn test_duplicate_join_is_noop() {
        let rig = rig();
        let feed_id = FeedId::generate();
        rig.seed_group(
            feed_id,
            &[
                ("alice", GroupParticipantType::Admin),
                ("bob", GroupParticipantType::Member),
            ],
        )
        .await;

        let handler = JoinGroupFeedHandler::new(rig.ctx.clone());
        handler.handle(&validated(join(feed_id), "bob"), 10).await.unwrap();

        let group = rig.store.get_group_feed(feed_id).await.unwrap().unwrap();
        // No rotation happened for the duplicate join.
        assert_eq!(group.current_key_generation, 0);
    }
}
