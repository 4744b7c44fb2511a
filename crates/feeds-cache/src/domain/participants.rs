//! Per-feed participant-set cache.
//!
//! Write path: synchronous add on join, removal on leave/ban, full
//! invalidation on membership-changing rotations. Read path:
//! cache-aside on lookup. TTL: session.

use crate::errors::CacheResult;
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use shared_types::entities::{FeedId, PublicAddress};
use std::sync::Arc;

/// Set of participant addresses per feed.
pub struct ParticipantsCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl ParticipantsCache {
    pub(crate) fn new(backend: Arc<dyn CacheBackend>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, feed_id: FeedId) -> String {
        format!("{}:feeds:participants:{feed_id}", self.prefix)
    }

    /// Add one participant.
    pub async fn add(&self, feed_id: FeedId, address: &PublicAddress) -> CacheResult<()> {
        self.backend
            .set_add(&self.key(feed_id), address.clone(), CacheTtl::Session)
            .await
    }

    /// Remove one participant.
    pub async fn remove(&self, feed_id: FeedId, address: &PublicAddress) -> CacheResult<()> {
        self.backend.set_remove(&self.key(feed_id), address).await
    }

    /// Drop the whole set; the next lookup repopulates from the store.
    pub async fn invalidate(&self, feed_id: FeedId) -> CacheResult<()> {
        self.backend.delete(&self.key(feed_id)).await
    }

    /// Replace the set wholesale (cache-aside repopulation).
    pub async fn replace(
        &self,
        feed_id: FeedId,
        addresses: Vec<PublicAddress>,
    ) -> CacheResult<()> {
        self.backend
            .set_put(&self.key(feed_id), addresses, CacheTtl::Session)
            .await
    }

    /// The cached set (sorted), `None` on a miss.
    pub async fn get(&self, feed_id: FeedId) -> CacheResult<Option<Vec<PublicAddress>>> {
        self.backend.set_members(&self.key(feed_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryCacheBackend;

    #[tokio::test]
    async fn test_lifecycle() {
        let cache = ParticipantsCache::new(Arc::new(InMemoryCacheBackend::new()), "test");
        let feed_id = FeedId::generate();

        cache.add(feed_id, &"alice".to_string()).await.unwrap();
        cache.add(feed_id, &"bob".to_string()).await.unwrap();
        assert_eq!(
            cache.get(feed_id).await.unwrap(),
            Some(vec!["alice".to_string(), "bob".to_string()])
        );

        cache.remove(feed_id, &"alice".to_string()).await.unwrap();
        assert_eq!(
            cache.get(feed_id).await.unwrap(),
            Some(vec!["bob".to_string()])
        );

        cache.invalidate(feed_id).await.unwrap();
        assert_eq!(cache.get(feed_id).await.unwrap(), None);
    }
}
