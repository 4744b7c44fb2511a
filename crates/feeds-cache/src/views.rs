//! # Feed Views
//!
//! The cache-aside read service behind the gRPC query surface: every
//! read consults its cache first, falls back to the store on a miss,
//! and repopulates opportunistically. Cache failures are logged and
//! degrade to store reads; no request fails because a cache did.

use crate::domain::{FeedCaches, FeedMetadataEntry, KeyGenerationDocument, KeyGenerationView};
use crate::errors::CacheError;
use feeds_store::{FeedsStore, StoreError};
use shared_types::collaborators::IdentityDirectory;
use shared_types::config::FeedsConfig;
use shared_types::entities::{BlockIndex, FeedId, FeedMessage, FeedType, PublicAddress};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Read-path failures. Only the store can fail a view; cache trouble
/// degrades silently.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The authoritative store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn cache_warn(what: &str, err: &CacheError) {
    warn!(cache = what, error = %err, "cache degraded, continuing");
}

/// Cache-aside read service over the derived views.
pub struct FeedViews {
    caches: Arc<FeedCaches>,
    store: Arc<dyn FeedsStore>,
    identity: Arc<dyn IdentityDirectory>,
    config: FeedsConfig,
}

impl FeedViews {
    /// Wire up the view service.
    pub fn new(
        caches: Arc<FeedCaches>,
        store: Arc<dyn FeedsStore>,
        identity: Arc<dyn IdentityDirectory>,
        config: FeedsConfig,
    ) -> Self {
        Self {
            caches,
            store,
            identity,
            config,
        }
    }

    /// The user's feed list.
    pub async fn user_feeds(&self, user: &PublicAddress) -> Result<Vec<FeedId>, ViewError> {
        match self.caches.user_feeds.get(user).await {
            Ok(Some(feeds)) => return Ok(feeds),
            Ok(None) => {}
            Err(e) => cache_warn("user-feeds", &e),
        }

        let feeds = self.store.list_feed_ids_for_user(user).await?;
        if let Err(e) = self.caches.user_feeds.replace(user, &feeds).await {
            cache_warn("user-feeds", &e);
        }
        Ok(feeds)
    }

    /// The feed's participant addresses.
    pub async fn feed_participants(
        &self,
        feed_id: FeedId,
    ) -> Result<Vec<PublicAddress>, ViewError> {
        match self.caches.participants.get(feed_id).await {
            Ok(Some(addresses)) => return Ok(addresses),
            Ok(None) => {}
            Err(e) => cache_warn("participants", &e),
        }

        let addresses = self.load_participants(feed_id).await?;
        if let Err(e) = self
            .caches
            .participants
            .replace(feed_id, addresses.clone())
            .await
        {
            cache_warn("participants", &e);
        }
        Ok(addresses)
    }

    /// The most recent messages of a feed, oldest first, capped at the
    /// configured response limit.
    pub async fn recent_messages(
        &self,
        feed_id: FeedId,
        limit: usize,
    ) -> Result<Vec<FeedMessage>, ViewError> {
        let limit = limit.min(self.config.max_messages_per_response);

        match self.caches.recent_messages.get(feed_id).await {
            Ok(Some(messages)) => {
                let start = messages.len().saturating_sub(limit);
                return Ok(messages[start..].to_vec());
            }
            Ok(None) => {}
            Err(e) => cache_warn("recent-messages", &e),
        }

        let messages = self
            .store
            .list_recent_messages(feed_id, self.config.max_messages_per_response)
            .await?;
        if let Err(e) = self.caches.recent_messages.replace(feed_id, &messages).await {
            cache_warn("recent-messages", &e);
        }
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    /// The group's key-generation document; `None` for unknown groups.
    pub async fn key_generation_document(
        &self,
        feed_id: FeedId,
    ) -> Result<Option<KeyGenerationDocument>, ViewError> {
        match self.caches.key_generations.get(feed_id).await {
            Ok(Some(document)) => return Ok(Some(document)),
            Ok(None) => {}
            Err(e) => cache_warn("key-generations", &e),
        }

        let Some(group) = self.store.get_group_feed(feed_id).await? else {
            return Ok(None);
        };
        let mut generations = Vec::new();
        for generation in self.store.list_key_generations(feed_id).await? {
            let keys = self
                .store
                .list_encrypted_member_keys(feed_id, generation.generation)
                .await?;
            generations.push(KeyGenerationView::from_rows(&generation, &keys));
        }
        let document = KeyGenerationDocument {
            feed_id,
            current_generation: group.current_key_generation,
            generations,
        };
        if let Err(e) = self.caches.key_generations.put(&document).await {
            cache_warn("key-generations", &e);
        }
        Ok(Some(document))
    }

    /// The user's feed-metadata overview.
    pub async fn feed_metadata(
        &self,
        user: &PublicAddress,
    ) -> Result<HashMap<FeedId, FeedMetadataEntry>, ViewError> {
        match self.caches.feed_metadata.get_all(user).await {
            Ok(Some(entries)) => return Ok(entries),
            Ok(None) => {}
            Err(e) => cache_warn("feed-metadata", &e),
        }

        let mut entries = HashMap::new();
        for feed_id in self.store.list_feed_ids_for_user(user).await? {
            if let Some(entry) = self.build_metadata_entry(user, feed_id).await? {
                entries.insert(feed_id, entry);
            }
        }
        if let Err(e) = self.caches.feed_metadata.replace(user, &entries).await {
            cache_warn("feed-metadata", &e);
        }
        Ok(entries)
    }

    /// Resolve a display name, falling back to the address itself when
    /// the directory has no profile.
    pub async fn display_name(&self, address: &PublicAddress) -> String {
        match self.caches.display_names.get(address).await {
            Ok(Some(alias)) => return alias,
            Ok(None) => {}
            Err(e) => cache_warn("display-names", &e),
        }

        match self.identity.lookup(address).await {
            Ok(profile) => {
                if let Err(e) = self.caches.display_names.put(address, &profile.alias).await {
                    cache_warn("display-names", &e);
                }
                profile.alias
            }
            Err(_) => address.clone(),
        }
    }

    /// Record an alias reported by the identity collaborator.
    pub async fn record_alias(&self, address: &PublicAddress, alias: &str) {
        if let Err(e) = self.caches.display_names.put(address, alias).await {
            cache_warn("display-names", &e);
        }
    }

    /// The user's read watermark for a feed.
    pub async fn read_watermark(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
    ) -> Result<Option<BlockIndex>, ViewError> {
        match self.caches.read_watermarks.get(user, feed_id).await {
            Ok(Some(block)) => return Ok(Some(block)),
            Ok(None) => {}
            Err(e) => cache_warn("read-watermarks", &e),
        }

        let position = self.store.get_read_position(user, feed_id).await?;
        if let Some(block) = position {
            if let Err(e) = self.caches.read_watermarks.advance(user, feed_id, block).await {
                cache_warn("read-watermarks", &e);
            }
        }
        Ok(position)
    }

    /// Write-through, max-wins watermark update. Returns the stored
    /// value after the merge.
    pub async fn set_read_watermark(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        block: BlockIndex,
    ) -> Result<BlockIndex, ViewError> {
        let stored = self.store.advance_read_position(user, feed_id, block).await?;
        if let Err(e) = self.caches.read_watermarks.advance(user, feed_id, stored).await {
            cache_warn("read-watermarks", &e);
        }
        Ok(stored)
    }

    async fn load_participants(&self, feed_id: FeedId) -> Result<Vec<PublicAddress>, ViewError> {
        if self.store.get_group_feed(feed_id).await?.is_some() {
            let participants = self.store.list_group_participants(feed_id).await?;
            return Ok(participants
                .iter()
                .filter(|p| {
                    p.is_active()
                        && p.participant_type
                            != shared_types::entities::GroupParticipantType::Banned
                })
                .map(|p| p.address.clone())
                .collect());
        }
        let participants = self.store.list_feed_participants(feed_id).await?;
        Ok(participants
            .iter()
            .map(|p| p.participant_address.clone())
            .collect())
    }

    async fn build_metadata_entry(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
    ) -> Result<Option<FeedMetadataEntry>, ViewError> {
        if let Some(group) = self.store.get_group_feed(feed_id).await? {
            let participants = self.load_participants(feed_id).await?;
            return Ok(Some(FeedMetadataEntry::from_group(&group, participants)));
        }

        let Some(feed) = self.store.get_feed(feed_id).await? else {
            return Ok(None);
        };
        let participants = self.load_participants(feed_id).await?;
        let title = match feed.feed_type {
            // Chat titles are per-user: the counterpart's display name.
            FeedType::Chat => match participants.iter().find(|a| *a != user) {
                Some(other) => self.display_name(other).await,
                None => feed.title.clone(),
            },
            _ => feed.title.clone(),
        };
        Ok(Some(FeedMetadataEntry::from_feed(
            &feed,
            title,
            participants,
        )))
    }
}
