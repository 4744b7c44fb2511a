//! Per-feed recent-message cache.
//!
//! Write path: write-through on every message insert, best effort; a
//! failed push logs at the caller and never fails the transaction.
//! Read path: cache-aside. TTL: session. The list is capped; the oldest
//! entries fall off.

use crate::errors::{CacheError, CacheResult};
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use shared_types::entities::{FeedId, FeedMessage};
use std::sync::Arc;

/// Ordered, capped message list per feed.
pub struct RecentMessagesCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
    cap: usize,
}

impl RecentMessagesCache {
    pub(crate) fn new(backend: Arc<dyn CacheBackend>, prefix: &str, cap: usize) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
            cap,
        }
    }

    fn key(&self, feed_id: FeedId) -> String {
        format!("{}:feeds:messages:{feed_id}", self.prefix)
    }

    /// Append one message, dropping the oldest beyond the cap.
    pub async fn push(&self, message: &FeedMessage) -> CacheResult<()> {
        let encoded =
            serde_json::to_string(message).map_err(|e| CacheError::Codec(e.to_string()))?;
        self.backend
            .list_push_capped(&self.key(message.feed_id), encoded, self.cap, CacheTtl::Session)
            .await
    }

    /// Replace the list wholesale (cache-aside repopulation). Only the
    /// newest `cap` messages are kept.
    pub async fn replace(&self, feed_id: FeedId, messages: &[FeedMessage]) -> CacheResult<()> {
        let start = messages.len().saturating_sub(self.cap);
        let encoded = messages[start..]
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CacheError::Codec(e.to_string()))?;
        self.backend
            .list_put(&self.key(feed_id), encoded, CacheTtl::Session)
            .await
    }

    /// Drop the list.
    pub async fn invalidate(&self, feed_id: FeedId) -> CacheResult<()> {
        self.backend.delete(&self.key(feed_id)).await
    }

    /// The cached messages, oldest first; `None` on a miss.
    pub async fn get(&self, feed_id: FeedId) -> CacheResult<Option<Vec<FeedMessage>>> {
        let Some(encoded) = self.backend.list_range(&self.key(feed_id)).await? else {
            return Ok(None);
        };
        encoded
            .iter()
            .map(|line| serde_json::from_str(line).map_err(|e| CacheError::Codec(e.to_string())))
            .collect::<CacheResult<Vec<FeedMessage>>>()
            .map(Some)
    }
}
