//! # Feed Events
//!
//! Defines all events that flow through the shared bus. Events are
//! fire-and-forget: the indexing worker never awaits subscribers, and
//! consumers must tolerate duplicates and gaps.

use serde::{Deserialize, Serialize};
use shared_types::entities::{BlockIndex, FeedId, PublicAddress};
use uuid::Uuid;

/// Coarse routing topics for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTopic {
    /// Startup and bootstrap events.
    Lifecycle,
    /// Group membership changes.
    Membership,
    /// Key rotation completions.
    Keys,
    /// Message indexing.
    Messages,
}

/// All events published by the feeds subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedEvent {
    /// The startup workflow finished; the operator has a personal feed
    /// (or one is on its way through the mempool). Emitted exactly once
    /// per process.
    FeedsInitialized {
        /// The operator's signing address.
        operator: PublicAddress,
    },

    /// A user joined a group (join or admin add).
    UserJoined {
        /// The group joined.
        feed_id: FeedId,
        /// The joining member.
        address: PublicAddress,
        /// Block the join was indexed at.
        block_index: BlockIndex,
    },

    /// A user was banned from a group.
    UserBanned {
        /// The group.
        feed_id: FeedId,
        /// The banned member.
        address: PublicAddress,
        /// Block the ban was indexed at.
        block_index: BlockIndex,
    },

    /// A key rotation was persisted.
    KeyRotationCompleted {
        /// The group rotated.
        feed_id: FeedId,
        /// The new current generation.
        generation: u64,
        /// Addresses that received a wrapped key in the new epoch.
        members: Vec<PublicAddress>,
    },

    /// A message was indexed.
    NewMessage {
        /// The feed written to.
        feed_id: FeedId,
        /// The message id.
        message_id: Uuid,
        /// Block the message was indexed at.
        block_index: BlockIndex,
    },
}

impl FeedEvent {
    /// The topic this event routes under.
    #[must_use]
    pub const fn topic(&self) -> EventTopic {
        match self {
            Self::FeedsInitialized { .. } => EventTopic::Lifecycle,
            Self::UserJoined { .. } | Self::UserBanned { .. } => EventTopic::Membership,
            Self::KeyRotationCompleted { .. } => EventTopic::Keys,
            Self::NewMessage { .. } => EventTopic::Messages,
        }
    }
}

/// Topic filter for subscriptions. An empty topic list matches
/// everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to receive. Empty means all.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Match every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Match only the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Does `event` pass this filter?
    #[must_use]
    pub fn matches(&self, event: &FeedEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}
