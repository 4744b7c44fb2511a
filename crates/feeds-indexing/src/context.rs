//! Shared context for transaction handlers.

use feeds_cache::{CacheError, FeedCaches, FeedMetadataEntry, FeedViews};
use feeds_keyring::RotationEngine;
use feeds_store::FeedsStore;
use shared_bus::EventPublisher;
use shared_types::config::FeedsConfig;
use shared_types::entities::{FeedId, GroupFeedParticipant, GroupParticipantType};
use std::sync::Arc;
use tracing::warn;

/// Everything a handler may touch, in the order the pipeline wires it:
/// the authoritative store, the rotation engine, the derived-view
/// caches, the read views (for display-name resolution), and the event
/// bus.
pub struct HandlerContext {
    /// Authoritative store.
    pub store: Arc<dyn FeedsStore>,
    /// Group key rotation engine.
    pub keyring: Arc<RotationEngine>,
    /// Derived-view caches (write paths).
    pub caches: Arc<FeedCaches>,
    /// Cache-aside read service (display names).
    pub views: Arc<FeedViews>,
    /// Fire-and-forget event bus.
    pub bus: Arc<dyn EventPublisher>,
    /// Recognized limits.
    pub config: FeedsConfig,
}

impl HandlerContext {
    /// Log a degraded cache and move on. No handler outcome depends on
    /// a cache write.
    pub(crate) fn cache_warn(&self, cache: &str, err: &CacheError) {
        murmur_telemetry::CACHE_WRITE_FAILURES.inc();
        warn!(cache, error = %err, "cache write degraded, continuing");
    }

    /// Active, non-banned participants of a group: the audience whose
    /// per-user views reflect the group.
    pub(crate) async fn visible_participants(&self, feed_id: FeedId) -> Vec<GroupFeedParticipant> {
        match self.store.list_group_participants(feed_id).await {
            Ok(participants) => participants
                .into_iter()
                .filter(|p| {
                    p.is_active() && p.participant_type != GroupParticipantType::Banned
                })
                .collect(),
            Err(e) => {
                warn!(feed = %feed_id, error = %e, "participant listing failed");
                Vec::new()
            }
        }
    }

    /// Rewrite every visible participant's metadata entry for a group
    /// from the store's current state.
    pub(crate) async fn refresh_group_metadata(&self, feed_id: FeedId) {
        let Ok(Some(group)) = self.store.get_group_feed(feed_id).await else {
            return;
        };
        let participants = self.visible_participants(feed_id).await;
        let addresses: Vec<_> = participants.iter().map(|p| p.address.clone()).collect();
        let entry = FeedMetadataEntry::from_group(&group, addresses);
        for participant in &participants {
            if let Err(e) = self
                .caches
                .feed_metadata
                .put(&participant.address, feed_id, &entry)
                .await
            {
                self.cache_warn("feed-metadata", &e);
            }
        }
    }
}
