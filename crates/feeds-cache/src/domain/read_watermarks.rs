//! Per-user read-watermark hash.
//!
//! Write path: write-through with a max-wins merge, so a stale client can
//! never move a watermark backwards. Read path: cache-aside from the
//! read-position table. TTL: ~30 days.

use crate::errors::CacheResult;
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use shared_types::entities::{BlockIndex, FeedId, PublicAddress};
use std::sync::Arc;

/// Per-user hash of `feed_id → last_read_block`.
pub struct ReadWatermarksCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl ReadWatermarksCache {
    pub(crate) fn new(backend: Arc<dyn CacheBackend>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, user: &PublicAddress) -> String {
        format!("{}:feeds:read:{user}", self.prefix)
    }

    /// Max-wins advance; returns the stored watermark after the merge.
    pub async fn advance(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        block: BlockIndex,
    ) -> CacheResult<BlockIndex> {
        self.backend
            .hash_put_numeric_max(
                &self.key(user),
                &feed_id.to_string(),
                block,
                CacheTtl::Days30,
            )
            .await
    }

    /// The cached watermark, `None` on a miss.
    pub async fn get(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
    ) -> CacheResult<Option<BlockIndex>> {
        let value = self
            .backend
            .hash_get(&self.key(user), &feed_id.to_string())
            .await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }
}
