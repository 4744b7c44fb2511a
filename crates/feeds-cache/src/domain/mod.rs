//! The seven derived-view caches.

pub mod display_names;
pub mod feed_metadata;
pub mod key_generations;
pub mod participants;
pub mod read_watermarks;
pub mod recent_messages;
pub mod user_feeds;

pub use display_names::DisplayNamesCache;
pub use feed_metadata::{FeedMetadataCache, FeedMetadataEntry};
pub use key_generations::{
    KeyGenerationDocument, KeyGenerationView, KeyGenerationsCache, MemberKeyView,
};
pub use participants::ParticipantsCache;
pub use read_watermarks::ReadWatermarksCache;
pub use recent_messages::RecentMessagesCache;
pub use user_feeds::UserFeedsCache;

use crate::ports::CacheBackend;
use shared_types::config::FeedsConfig;
use std::sync::Arc;

/// All derived-view caches over one backend, sharing the tenant key
/// prefix.
pub struct FeedCaches {
    /// Per-user feed-id set.
    pub user_feeds: UserFeedsCache,
    /// Per-feed participant set.
    pub participants: ParticipantsCache,
    /// Per-feed capped message list.
    pub recent_messages: RecentMessagesCache,
    /// Per-feed key-generation document.
    pub key_generations: KeyGenerationsCache,
    /// Per-user feed metadata hash.
    pub feed_metadata: FeedMetadataCache,
    /// Identity display-name hash.
    pub display_names: DisplayNamesCache,
    /// Per-user read watermarks.
    pub read_watermarks: ReadWatermarksCache,
}

impl FeedCaches {
    /// Build all caches over one backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, config: &FeedsConfig) -> Self {
        let prefix = config.cache_key_prefix.as_str();
        Self {
            user_feeds: UserFeedsCache::new(backend.clone(), prefix),
            participants: ParticipantsCache::new(backend.clone(), prefix),
            recent_messages: RecentMessagesCache::new(
                backend.clone(),
                prefix,
                config.max_messages_per_response,
            ),
            key_generations: KeyGenerationsCache::new(backend.clone(), prefix),
            feed_metadata: FeedMetadataCache::new(backend.clone(), prefix),
            display_names: DisplayNamesCache::new(backend.clone(), prefix),
            read_watermarks: ReadWatermarksCache::new(backend, prefix),
        }
    }
}
