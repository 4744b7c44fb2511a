//! Per-user feed-metadata hash.
//!
//! Write path: written on create, `last_block_index` bumped on every
//! message, title cascaded to all active participants on title change,
//! entries removed on ban. Read path: cache-aside, rebuilt from the
//! store on a miss. No TTL.

use crate::errors::{CacheError, CacheResult};
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use serde::{Deserialize, Serialize};
use shared_types::entities::{BlockIndex, Feed, FeedId, FeedType, GroupFeed, PublicAddress};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One feed as it appears in a user's overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMetadataEntry {
    /// Display title. For chat feeds this is the *other* participant's
    /// display name, resolved at creation.
    pub title: String,
    /// Personal, Chat or Group.
    pub feed_type: FeedType,
    /// Block of the last activity in the feed.
    pub last_block_index: BlockIndex,
    /// Participant addresses.
    pub participants: Vec<PublicAddress>,
    /// Block the feed was created at.
    pub created_at_block: BlockIndex,
    /// Current key generation; groups only.
    pub current_key_generation: Option<u64>,
}

impl FeedMetadataEntry {
    /// Build an entry for a personal or chat feed.
    #[must_use]
    pub fn from_feed(feed: &Feed, title: String, participants: Vec<PublicAddress>) -> Self {
        Self {
            title,
            feed_type: feed.feed_type,
            last_block_index: feed.last_updated_at_block,
            participants,
            created_at_block: feed.created_at_block,
            current_key_generation: None,
        }
    }

    /// Build an entry for a group feed.
    #[must_use]
    pub fn from_group(group: &GroupFeed, participants: Vec<PublicAddress>) -> Self {
        Self {
            title: group.title.clone(),
            feed_type: FeedType::Group,
            last_block_index: group.last_updated_at_block,
            participants,
            created_at_block: group.created_at_block,
            current_key_generation: Some(group.current_key_generation),
        }
    }
}

/// Per-user hash of `feed_id → FeedMetadataEntry`.
pub struct FeedMetadataCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl FeedMetadataCache {
    pub(crate) fn new(backend: Arc<dyn CacheBackend>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, user: &PublicAddress) -> String {
        format!("{}:feeds:metadata:{user}", self.prefix)
    }

    /// Write one entry.
    pub async fn put(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        entry: &FeedMetadataEntry,
    ) -> CacheResult<()> {
        let encoded =
            serde_json::to_string(entry).map_err(|e| CacheError::Codec(e.to_string()))?;
        self.backend
            .hash_put(
                &self.key(user),
                &feed_id.to_string(),
                encoded,
                CacheTtl::Persistent,
            )
            .await
    }

    /// Remove one entry (ban path).
    pub async fn remove(&self, user: &PublicAddress, feed_id: FeedId) -> CacheResult<()> {
        self.backend
            .hash_delete(&self.key(user), &feed_id.to_string())
            .await
    }

    /// Read one entry.
    pub async fn get(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
    ) -> CacheResult<Option<FeedMetadataEntry>> {
        let Some(encoded) = self
            .backend
            .hash_get(&self.key(user), &feed_id.to_string())
            .await?
        else {
            return Ok(None);
        };
        serde_json::from_str(&encoded)
            .map(Some)
            .map_err(|e| CacheError::Codec(e.to_string()))
    }

    /// The user's whole overview; `None` on a miss.
    pub async fn get_all(
        &self,
        user: &PublicAddress,
    ) -> CacheResult<Option<HashMap<FeedId, FeedMetadataEntry>>> {
        let Some(pairs) = self.backend.hash_entries(&self.key(user)).await? else {
            return Ok(None);
        };
        let mut map = HashMap::with_capacity(pairs.len());
        for (field, encoded) in pairs {
            let feed_id = Uuid::parse_str(&field)
                .map(FeedId)
                .map_err(|e| CacheError::Codec(e.to_string()))?;
            let entry =
                serde_json::from_str(&encoded).map_err(|e| CacheError::Codec(e.to_string()))?;
            map.insert(feed_id, entry);
        }
        Ok(Some(map))
    }

    /// Replace the user's whole overview (cache-aside rebuild).
    pub async fn replace(
        &self,
        user: &PublicAddress,
        entries: &HashMap<FeedId, FeedMetadataEntry>,
    ) -> CacheResult<()> {
        let mut fields = Vec::with_capacity(entries.len());
        for (feed_id, entry) in entries {
            let encoded =
                serde_json::to_string(entry).map_err(|e| CacheError::Codec(e.to_string()))?;
            fields.push((feed_id.to_string(), encoded));
        }
        self.backend
            .hash_put_all(&self.key(user), fields, CacheTtl::Persistent)
            .await
    }

    /// Bump the `last_block_index` of one entry, if cached.
    pub async fn touch(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        block: BlockIndex,
    ) -> CacheResult<()> {
        if let Some(mut entry) = self.get(user, feed_id).await? {
            entry.last_block_index = block;
            self.put(user, feed_id, &entry).await?;
        }
        Ok(())
    }

    /// Rewrite the title of one entry, if cached (title-change cascade).
    pub async fn retitle(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        title: &str,
    ) -> CacheResult<()> {
        if let Some(mut entry) = self.get(user, feed_id).await? {
            entry.title = title.to_string();
            self.put(user, feed_id, &entry).await?;
        }
        Ok(())
    }

    /// Rewrite the current key generation of one entry, if cached.
    pub async fn set_generation(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        generation: u64,
    ) -> CacheResult<()> {
        if let Some(mut entry) = self.get(user, feed_id).await? {
            entry.current_key_generation = Some(generation);
            self.put(user, feed_id, &entry).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryCacheBackend;

    fn entry(title: &str) -> FeedMetadataEntry {
        FeedMetadataEntry {
            title: title.to_string(),
            feed_type: FeedType::Group,
            last_block_index: 5,
            participants: vec!["alice".to_string()],
            created_at_block: 1,
            current_key_generation: Some(0),
        }
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let cache = FeedMetadataCache::new(Arc::new(InMemoryCacheBackend::new()), "test");
        let user = "alice".to_string();
        let feed_id = FeedId::generate();

        cache.put(&user, feed_id, &entry("Group")).await.unwrap();
        assert_eq!(
            cache.get(&user, feed_id).await.unwrap().unwrap().title,
            "Group"
        );

        cache.remove(&user, feed_id).await.unwrap();
        assert_eq!(cache.get(&user, feed_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_touch_and_retitle() {
        let cache = FeedMetadataCache::new(Arc::new(InMemoryCacheBackend::new()), "test");
        let user = "alice".to_string();
        let feed_id = FeedId::generate();
        cache.put(&user, feed_id, &entry("Old")).await.unwrap();

        cache.touch(&user, feed_id, 42).await.unwrap();
        cache.retitle(&user, feed_id, "New").await.unwrap();

        let stored = cache.get(&user, feed_id).await.unwrap().unwrap();
        assert_eq!(stored.last_block_index, 42);
        assert_eq!(stored.title, "New");
    }

    #[tokio::test]
    async fn test_touch_missing_entry_is_noop() {
        let cache = FeedMetadataCache::new(Arc::new(InMemoryCacheBackend::new()), "test");
        cache
            .touch(&"alice".to_string(), FeedId::generate(), 42)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_all_roundtrip() {
        let cache = FeedMetadataCache::new(Arc::new(InMemoryCacheBackend::new()), "test");
        let user = "alice".to_string();
        let mut entries = HashMap::new();
        entries.insert(FeedId::generate(), entry("A"));
        entries.insert(FeedId::generate(), entry("B"));

        cache.replace(&user, &entries).await.unwrap();
        assert_eq!(cache.get_all(&user).await.unwrap().unwrap(), entries);
    }
}
