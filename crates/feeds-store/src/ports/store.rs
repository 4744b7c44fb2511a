//! The authoritative store port.
//!
//! Every mutator preserves the data-model invariants on its own: callers
//! compose them but never need compensating writes. Each call executes
//! as a single store transaction; either all of its effects land or none
//! do.

use crate::errors::StoreError;
use async_trait::async_trait;
use shared_types::entities::{
    BlockIndex, EncryptedMemberKey, Feed, FeedId, FeedMessage, FeedParticipant, GroupFeed,
    GroupFeedParticipant, KeyGeneration, PublicAddress,
};

/// Authoritative persistence for feeds, participants, group metadata,
/// messages, key generations and per-member encrypted key rows.
#[async_trait]
pub trait FeedsStore: Send + Sync {
    // =========================================================================
    // PERSONAL AND CHAT FEEDS
    // =========================================================================

    /// Conditionally create a personal feed for the participant's
    /// address. Returns `false` without touching anything when the
    /// creator already owns a personal feed.
    ///
    /// # Errors
    ///
    /// `Conflict` if the feed id itself is already taken.
    async fn create_personal_feed_if_absent(
        &self,
        feed: Feed,
        participant: FeedParticipant,
    ) -> Result<bool, StoreError>;

    /// The personal feed owned by `owner`, if any.
    async fn get_personal_feed_of(&self, owner: &PublicAddress)
        -> Result<Option<Feed>, StoreError>;

    /// Create a chat feed with its two owner participants.
    async fn insert_chat_feed(
        &self,
        feed: Feed,
        participants: Vec<FeedParticipant>,
    ) -> Result<(), StoreError>;

    /// Look up a personal or chat feed.
    async fn get_feed(&self, feed_id: FeedId) -> Result<Option<Feed>, StoreError>;

    /// Participants of a personal or chat feed.
    async fn list_feed_participants(
        &self,
        feed_id: FeedId,
    ) -> Result<Vec<FeedParticipant>, StoreError>;

    // =========================================================================
    // GROUP FEEDS
    // =========================================================================

    /// Create a group feed together with its initial participants, key
    /// generation 0 and the genesis member-key rows, atomically.
    async fn insert_group_feed(
        &self,
        group: GroupFeed,
        participants: Vec<GroupFeedParticipant>,
        genesis: KeyGeneration,
        keys: Vec<EncryptedMemberKey>,
    ) -> Result<(), StoreError>;

    /// Look up a group feed.
    async fn get_group_feed(&self, feed_id: FeedId) -> Result<Option<GroupFeed>, StoreError>;

    /// One participant row, regardless of state.
    async fn get_group_participant(
        &self,
        feed_id: FeedId,
        address: &PublicAddress,
    ) -> Result<Option<GroupFeedParticipant>, StoreError>;

    /// All participant rows of a group.
    async fn list_group_participants(
        &self,
        feed_id: FeedId,
    ) -> Result<Vec<GroupFeedParticipant>, StoreError>;

    /// Insert or replace the participant row for (feed, address). The
    /// single-row-per-address shape keeps at most one active row per
    /// (feed, address) pair.
    async fn upsert_group_participant(
        &self,
        participant: GroupFeedParticipant,
    ) -> Result<(), StoreError>;

    /// Number of active admins.
    async fn count_admins(&self, feed_id: FeedId) -> Result<usize, StoreError>;

    /// Set the group title and bump `last_updated_at_block`.
    async fn set_group_title(
        &self,
        feed_id: FeedId,
        title: String,
        block: BlockIndex,
    ) -> Result<(), StoreError>;

    /// Set the group description and bump `last_updated_at_block`.
    async fn set_group_description(
        &self,
        feed_id: FeedId,
        description: String,
        block: BlockIndex,
    ) -> Result<(), StoreError>;

    /// Soft-delete the group. History stays readable; further writes are
    /// rejected upstream by validation.
    async fn set_group_deleted(&self, feed_id: FeedId, block: BlockIndex)
        -> Result<(), StoreError>;

    /// Bump a group's `last_updated_at_block`.
    async fn touch_group(&self, feed_id: FeedId, block: BlockIndex) -> Result<(), StoreError>;

    // =========================================================================
    // KEY GENERATIONS
    // =========================================================================

    /// The generation the `current_key_generation` pointer names.
    async fn get_current_key_generation(
        &self,
        feed_id: FeedId,
    ) -> Result<Option<KeyGeneration>, StoreError>;

    /// All generations of a group, ascending.
    async fn list_key_generations(
        &self,
        feed_id: FeedId,
    ) -> Result<Vec<KeyGeneration>, StoreError>;

    /// Member-key rows of one generation.
    async fn list_encrypted_member_keys(
        &self,
        feed_id: FeedId,
        generation: u64,
    ) -> Result<Vec<EncryptedMemberKey>, StoreError>;

    /// Persist a new key generation, its member-key rows, the close of
    /// the superseded epoch and the group's `current_key_generation`
    /// pointer in one transaction.
    ///
    /// # Errors
    ///
    /// `Conflict` unless `generation.generation` continues the group's
    /// epoch sequence exactly (`current + 1`).
    async fn persist_key_generation(
        &self,
        generation: KeyGeneration,
        keys: Vec<EncryptedMemberKey>,
    ) -> Result<(), StoreError>;

    // =========================================================================
    // MESSAGES
    // =========================================================================

    /// Append a message and bump the owning feed's
    /// `last_updated_at_block`.
    async fn insert_message(&self, message: FeedMessage) -> Result<(), StoreError>;

    /// The most recent `limit` messages of a feed, oldest first.
    async fn list_recent_messages(
        &self,
        feed_id: FeedId,
        limit: usize,
    ) -> Result<Vec<FeedMessage>, StoreError>;

    // =========================================================================
    // PER-USER VIEWS
    // =========================================================================

    /// Ids of every feed the user can currently see: their personal and
    /// chat feeds, plus groups where they are active and not banned.
    async fn list_feed_ids_for_user(
        &self,
        user: &PublicAddress,
    ) -> Result<Vec<FeedId>, StoreError>;

    // =========================================================================
    // READ POSITIONS
    // =========================================================================

    /// Max-wins upsert of the user's read watermark. Returns the stored
    /// value after the merge.
    async fn advance_read_position(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        block: BlockIndex,
    ) -> Result<BlockIndex, StoreError>;

    /// The user's read watermark for a feed.
    async fn get_read_position(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
    ) -> Result<Option<BlockIndex>, StoreError>;
}
