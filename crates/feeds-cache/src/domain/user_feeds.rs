//! Per-user feed-list cache.
//!
//! Write path: in-place set add/remove on create, join, leave, ban and
//! block. Read path: cache-aside, populated on the first list request.
//! TTL: minutes.

use crate::errors::CacheResult;
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use shared_types::entities::{FeedId, PublicAddress};
use std::sync::Arc;
use uuid::Uuid;

/// Set of feed ids per user.
pub struct UserFeedsCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl UserFeedsCache {
    pub(crate) fn new(backend: Arc<dyn CacheBackend>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, user: &PublicAddress) -> String {
        format!("{}:feeds:user:{user}", self.prefix)
    }

    /// Add a feed to the user's list.
    pub async fn add(&self, user: &PublicAddress, feed_id: FeedId) -> CacheResult<()> {
        self.backend
            .set_add(&self.key(user), feed_id.to_string(), CacheTtl::Minutes)
            .await
    }

    /// Remove a feed from the user's list.
    pub async fn remove(&self, user: &PublicAddress, feed_id: FeedId) -> CacheResult<()> {
        self.backend
            .set_remove(&self.key(user), &feed_id.to_string())
            .await
    }

    /// Replace the user's list wholesale (cache-aside repopulation).
    pub async fn replace(&self, user: &PublicAddress, feeds: &[FeedId]) -> CacheResult<()> {
        let members = feeds.iter().map(FeedId::to_string).collect();
        self.backend
            .set_put(&self.key(user), members, CacheTtl::Minutes)
            .await
    }

    /// The cached list, `None` on a miss.
    pub async fn get(&self, user: &PublicAddress) -> CacheResult<Option<Vec<FeedId>>> {
        let members = self.backend.set_members(&self.key(user)).await?;
        Ok(members.map(|members| {
            members
                .iter()
                .filter_map(|m| Uuid::parse_str(m).ok().map(FeedId))
                .collect()
        }))
    }
}
