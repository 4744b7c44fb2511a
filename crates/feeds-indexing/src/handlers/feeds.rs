//! Handlers for feed creation kinds.

use crate::context::HandlerContext;
use crate::errors::IndexingError;
use crate::handlers::TransactionHandler;
use async_trait::async_trait;
use feeds_store::StoreError;
use rand::distributions::Alphanumeric;
use rand::Rng;
use feeds_cache::FeedMetadataEntry;
use shared_types::entities::{
    BlockIndex, EncryptedMemberKey, Feed, FeedParticipant, FeedRole, FeedType, GroupFeed,
    GroupFeedParticipant, GroupParticipantType, KeyGeneration, RotationTrigger,
};
use shared_types::transactions::{TransactionKind, TransactionPayload, ValidatedTransaction};
use std::sync::Arc;
use tracing::{debug, warn};

/// Length of generated invite codes.
const INVITE_CODE_LEN: usize = 22;

fn invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}

/// `NewPersonalFeed`: conditional create of the operator's self-notes
/// feed. A creator that already owns one is a store-level no-op.
pub struct NewPersonalFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl NewPersonalFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for NewPersonalFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewPersonalFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::NewPersonalFeed(payload) = &tx.payload else {
            warn!("NewPersonalFeed handler received foreign payload");
            return Ok(());
        };
        if payload.feed_id.is_nil() || payload.encrypted_feed_key.is_empty() {
            warn!(feed = %payload.feed_id, "rejecting personal feed with nil id or empty key");
            return Ok(());
        }

        let creator = tx.user_signature.signatory.clone();
        let feed = Feed {
            feed_id: payload.feed_id,
            title: String::new(),
            feed_type: FeedType::Personal,
            created_at_block: block_index,
            last_updated_at_block: block_index,
        };
        let participant = FeedParticipant {
            feed_id: payload.feed_id,
            participant_address: creator.clone(),
            role: FeedRole::Owner,
            encrypted_feed_key: payload.encrypted_feed_key.clone(),
        };

        let created = match self
            .ctx
            .store
            .create_personal_feed_if_absent(feed.clone(), participant)
            .await
        {
            Ok(created) => created,
            Err(StoreError::Conflict(reason)) => {
                warn!(feed = %payload.feed_id, reason, "personal feed create conflicted, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if !created {
            debug!(owner = %creator, "personal feed already present");
            return Ok(());
        }
        murmur_telemetry::FEEDS_CREATED.inc();

        if let Err(e) = self.ctx.caches.user_feeds.add(&creator, payload.feed_id).await {
            self.ctx.cache_warn("user-feeds", &e);
        }
        let entry = FeedMetadataEntry::from_feed(
            &feed,
            feed.title.clone(),
            vec![creator.clone()],
        );
        if let Err(e) = self
            .ctx
            .caches
            .feed_metadata
            .put(&creator, payload.feed_id, &entry)
            .await
        {
            self.ctx.cache_warn("feed-metadata", &e);
        }
        Ok(())
    }
}

/// `NewChatFeed`: create the two-owner chat feed; each side's cached
/// title is the other side's display name.
pub struct NewChatFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl NewChatFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for NewChatFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewChatFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::NewChatFeed(payload) = &tx.payload else {
            warn!("NewChatFeed handler received foreign payload");
            return Ok(());
        };
        if payload.participants.len() != 2 {
            warn!(feed = %payload.feed_id, "chat feed without exactly 2 participants");
            return Ok(());
        }

        let feed = Feed {
            feed_id: payload.feed_id,
            title: String::new(),
            feed_type: FeedType::Chat,
            created_at_block: block_index,
            last_updated_at_block: block_index,
        };
        let participants: Vec<FeedParticipant> = payload
            .participants
            .iter()
            .map(|slot| FeedParticipant {
                feed_id: payload.feed_id,
                participant_address: slot.address.clone(),
                role: FeedRole::Owner,
                encrypted_feed_key: slot.encrypted_feed_key.clone(),
            })
            .collect();

        match self.ctx.store.insert_chat_feed(feed.clone(), participants).await {
            Ok(()) => {}
            Err(StoreError::Conflict(reason)) => {
                warn!(feed = %payload.feed_id, reason, "chat feed create conflicted, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        murmur_telemetry::FEEDS_CREATED.inc();

        let addresses: Vec<_> = payload.participants.iter().map(|s| s.address.clone()).collect();
        for (index, slot) in payload.participants.iter().enumerate() {
            let other = &payload.participants[1 - index].address;
            let title = self.ctx.views.display_name(other).await;

            if let Err(e) = self.ctx.caches.user_feeds.add(&slot.address, payload.feed_id).await {
                self.ctx.cache_warn("user-feeds", &e);
            }
            let entry =
                FeedMetadataEntry::from_feed(&feed, title, addresses.clone());
            if let Err(e) = self
                .ctx
                .caches
                .feed_metadata
                .put(&slot.address, payload.feed_id, &entry)
                .await
            {
                self.ctx.cache_warn("feed-metadata", &e);
            }
        }
        Ok(())
    }
}

/// `NewGroupFeed`: create the group, the creator as Admin, everyone
/// else as Member, and key generation 0 from the payload's wraps.
/// Public groups get an invite code.
pub struct NewGroupFeedHandler {
    ctx: Arc<HandlerContext>,
}

impl NewGroupFeedHandler {
    /// Wire up the handler.
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TransactionHandler for NewGroupFeedHandler {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NewGroupFeed
    }

    async fn handle(
        &self,
        tx: &ValidatedTransaction,
        block_index: BlockIndex,
    ) -> Result<(), IndexingError> {
        let TransactionPayload::NewGroupFeed(payload) = &tx.payload else {
            warn!("NewGroupFeed handler received foreign payload");
            return Ok(());
        };
        let creator = &tx.user_signature.signatory;

        let group = GroupFeed {
            feed_id: payload.feed_id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            is_public: payload.is_public,
            is_deleted: false,
            invite_code: payload.is_public.then(invite_code),
            current_key_generation: 0,
            created_at_block: block_index,
            last_updated_at_block: block_index,
        };
        let participants: Vec<GroupFeedParticipant> = payload
            .participants
            .iter()
            .map(|address| GroupFeedParticipant {
                feed_id: payload.feed_id,
                address: address.clone(),
                participant_type: if address == creator {
                    GroupParticipantType::Admin
                } else {
                    GroupParticipantType::Member
                },
                joined_at_block: block_index,
                left_at_block: None,
                last_leave_block: None,
            })
            .collect();
        let genesis = KeyGeneration {
            feed_id: payload.feed_id,
            generation: 0,
            valid_from_block: block_index,
            valid_to_block: None,
            trigger: RotationTrigger::Join,
        };
        let keys: Vec<EncryptedMemberKey> = payload
            .encrypted_keys
            .iter()
            .map(|slot| EncryptedMemberKey {
                feed_id: payload.feed_id,
                generation: 0,
                member_address: slot.member_address.clone(),
                encrypted_aes_key: slot.encrypted_aes_key.clone(),
            })
            .collect();

        match self
            .ctx
            .store
            .insert_group_feed(group, participants, genesis, keys)
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict(reason)) => {
                warn!(feed = %payload.feed_id, reason, "group feed create conflicted, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        murmur_telemetry::FEEDS_CREATED.inc();

        if let Err(e) = self
            .ctx
            .caches
            .participants
            .replace(payload.feed_id, payload.participants.clone())
            .await
        {
            self.ctx.cache_warn("participants", &e);
        }
        for address in &payload.participants {
            if let Err(e) = self.ctx.caches.user_feeds.add(address, payload.feed_id).await {
                self.ctx.cache_warn("user-feeds", &e);
            }
        }
        self.ctx.refresh_group_metadata(payload.feed_id).await;
        Ok(())
    }
}
