//! Handlers for moderation and metadata kinds.
//!
//! Ban and unban rotate the group key; block, unblock and promote only
//! flip the participant's role. Blocked members keep the current key
//! (they stay entitled and can still decrypt); banned members are
//! structurally excluded from every later epoch.

use crate::context::HandlerContext;
use crate::errors::IndexingError;
use crate::handlers::TransactionHandler;
use async_trait::async_trait;
use feeds_keyring::JoiningMember;
use shared_bus::FeedEvent;
use shared_types::entities::{
    BlockIndex, FeedId, GroupParticipantType, PublicAddress, RotationTrigger,
};
use shared_types::transactions::{TransactionKind, TransactionPayload, ValidatedTransaction};
use std::sync::Arc;
use tracing::{error, warn};

/// Flip a participant's role; `Ok(true)` when the row existed and was
/// active.
async fn set_role(
    ctx: &HandlerContext,
    feed_id: FeedId,
    target: &PublicAddress,
    role: GroupParticipantType,
) -> Result<bool, IndexingError> {
    match ctx.store.get_group_participant(feed_id, target).await? {
        Some(mut participant) if participant.is_active() => {
            participant.participant_type = role;
            ctx.store.upsert_group_participant(participant).await?;
            Ok(true)
        }
        _ => {
            warn!(feed = %feed_id, target = %target, "moderation target missing or left, skipping");
            Ok(false)
        }
    }
}

/// `BanFromGroupFeed`: mark Banned, rotate without the target, scrub
/// the target's derived views.
pub struct BanFromGroupFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl BanFromGroupFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for BanFromGroupFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::BanFromGroupFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::BanFromGroupFeed(payload) = &tx.payload else {
            warn!("BanFromGroupFeed handler received foreign payload");
            return Ok(());
        };
        let feed_id = payload.feed_id;
        let target = &payload.member_address;

        if !set_role(&self.ctx, feed_id, target, GroupParticipantType::Banned).await? {
            return Ok(());
        }

        let rotated = self
            .ctx
            .keyring
            .rotate_and_persist(feed_id, RotationTrigger::Ban, None, Some(target), block_index)
            .await;
        if let Err(e) = rotated {
            error!(feed = %feed_id, target = %target, error = %e, "ban rotation failed");
        }

        if let Err(e) = self.ctx.caches.key_generations.invalidate(feed_id).await {
            self.ctx.cache_warn("key-generations", &e);
        }
        if let Err(e) = self.ctx.caches.participants.remove(feed_id, target).await {
            self.ctx.cache_warn("participants", &e);
        }
        if let Err(e) = self.ctx.caches.user_feeds.remove(target, feed_id).await {
            self.ctx.cache_warn("user-feeds", &e);
        }
        if let Err(e) = self.ctx.caches.feed_metadata.remove(target, feed_id).await {
            self.ctx.cache_warn("feed-metadata", &e);
        }
        self.ctx.store.touch_group(feed_id, block_index).await?;
        self.ctx.refresh_group_metadata(feed_id).await;

        self.ctx
            .bus
            .publish(FeedEvent::UserBanned {
                feed_id,
                address: target.clone(),
                block_index,
            })
            .await;
        Ok(())
    }
}

/// `UnbanFromGroupFeed`: restore Member and rotate with the target back
/// in. The unbanned member cannot decrypt the ban era: no epoch created
/// while they were banned carries a wrap for them, and old keys are
/// never re-delivered.
pub struct UnbanFromGroupFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl UnbanFromGroupFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for UnbanFromGroupFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::UnbanFromGroupFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::UnbanFromGroupFeed(payload) = &tx.payload else {
            warn!("UnbanFromGroupFeed handler received foreign payload");
            return Ok(());
        };
        let feed_id = payload.feed_id;
        let target = &payload.member_address;

        if !set_role(&self.ctx, feed_id, target, GroupParticipantType::Member).await? {
            return Ok(());
        }

        let rotated = self
            .ctx
            .keyring
            .rotate_and_persist(
                feed_id,
                RotationTrigger::Unban,
                Some(JoiningMember {
                    address: target.clone(),
                    encrypt_address: None,
                }),
                None,
                block_index,
            )
            .await;
        if let Err(e) = rotated {
            error!(feed = %feed_id, target = %target, error = %e, "unban rotation failed");
        }

        if let Err(e) = self.ctx.caches.key_generations.invalidate(feed_id).await {
            self.ctx.cache_warn("key-generations", &e);
        }
        if let Err(e) = self.ctx.caches.participants.add(feed_id, target).await {
            self.ctx.cache_warn("participants", &e);
        }
        self.ctx.store.touch_group(feed_id, block_index).await?;
        self.ctx.refresh_group_metadata(feed_id).await;
        Ok(())
    }
}

/// `BlockMember`: Member → Blocked. No rotation; the blocked member
/// keeps the current key and is denied on the send side only. Their
/// own feed list drops the group.
pub struct BlockMemberHandler {
    ctx: Arc<HandlerContext>,
}

impl BlockMemberHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for BlockMemberHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::BlockMember
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        _block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::BlockMember(payload) = &tx.payload else {
            warn!("BlockMember handler received foreign payload");
            return Ok(());
        };
        if set_role(
            &self.ctx,
            payload.feed_id,
            &payload.member_address,
            GroupParticipantType::Blocked,
        )
        .await?
        {
            if let Err(e) = self
                .ctx
                .caches
                .user_feeds
                .remove(&payload.member_address, payload.feed_id)
                .await
            {
                self.ctx.cache_warn("user-feeds", &e);
            }
        }
        Ok(())
    }
}

/// `UnblockMember`: Blocked → Member. No rotation. The victim-side feed
/// list is not re-added here; it heals on their next cache-aside read.
pub struct UnblockMemberHandler {
    ctx: Arc<HandlerContext>,
}

impl UnblockMemberHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for UnblockMemberHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::UnblockMember
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        _block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::UnblockMember(payload) = &tx.payload else {
            warn!("UnblockMember handler received foreign payload");
            return Ok(());
        };
        set_role(
            &self.ctx,
            payload.feed_id,
            &payload.member_address,
            GroupParticipantType::Member,
        )
        .await?;
        Ok(())
    }
}

/// `PromoteToAdmin`: Member → Admin. No rotation.
pub struct PromoteToAdminHandler {
    ctx: Arc<HandlerContext>,
}

impl PromoteToAdminHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for PromoteToAdminHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::PromoteToAdmin
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        _block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::PromoteToAdmin(payload) = &tx.payload else {
            warn!("PromoteToAdmin handler received foreign payload");
            return Ok(());
        };
        set_role(
            &self.ctx,
            payload.feed_id,
            &payload.member_address,
            GroupParticipantType::Admin,
        )
        .await?;
        Ok(())
    }
}

/// `DeleteGroupFeed`: soft delete. Rows are kept; further writes are
/// rejected upstream.
pub struct DeleteGroupFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl DeleteGroupFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for DeleteGroupFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::DeleteGroupFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::DeleteGroupFeed(payload) = &tx.payload else {
            warn!("DeleteGroupFeed handler received foreign payload");
            return Ok(());
        };
        match self.ctx.store.set_group_deleted(payload.feed_id, block_index).await {
            Ok(()) => Ok(()),
            Err(feeds_store::StoreError::GroupNotFound(_)) => {
                warn!(feed = %payload.feed_id, "delete of unknown group, skipping");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// `UpdateGroupFeedTitle`: mutate the group row and cascade the new
/// title into every visible participant's metadata entry.
pub struct UpdateGroupFeedTitleHandler {
    ctx: Arc<HandlerContext>,
}

impl UpdateGroupFeedTitleHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for UpdateGroupFeedTitleHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::UpdateGroupFeedTitle
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::UpdateGroupFeedTitle(payload) = &tx.payload else {
            warn!("UpdateGroupFeedTitle handler received foreign payload");
            return Ok(());
        };
        match self
            .ctx
            .store
            .set_group_title(payload.feed_id, payload.title.clone(), block_index)
            .await
        {
            Ok(()) => {}
            Err(feeds_store::StoreError::GroupNotFound(_)) => {
                warn!(feed = %payload.feed_id, "title update of unknown group, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        for participant in self.ctx.visible_participants(payload.feed_id).await {
            if let Err(e) = self
                .ctx
                .caches
                .feed_metadata
                .retitle(&participant.address, payload.feed_id, &payload.title)
                .await
            {
                self.ctx.cache_warn("feed-metadata", &e);
            }
        }
        Ok(())
    }
}

/// `UpdateGroupFeedDescription`: mutate the group row.
pub struct UpdateGroupFeedDescriptionHandler {
    ctx: Arc<HandlerContext>,
}

impl UpdateGroupFeedDescriptionHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for UpdateGroupFeedDescriptionHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::UpdateGroupFeedDescription
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::UpdateGroupFeedDescription(payload) = &tx.payload else {
            warn!("UpdateGroupFeedDescription handler received foreign payload");
            return Ok(());
        };
        match self
            .ctx
            .store
            .set_group_description(payload.feed_id, payload.description.clone(), block_index)
            .await
        {
            Ok(()) => Ok(()),
            Err(feeds_store::StoreError::GroupNotFound(_)) => {
                warn!(feed = %payload.feed_id, "description update of unknown group, skipping");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
