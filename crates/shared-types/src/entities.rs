//! # Core Domain Entities
//!
//! Defines the feed-subsystem entities shared by every crate in the
//! workspace.
//!
//! ## Clusters
//!
//! - **Feeds**: `Feed`, `FeedParticipant` (personal and chat channels)
//! - **Groups**: `GroupFeed`, `GroupFeedParticipant`
//! - **Key Epochs**: `KeyGeneration`, `EncryptedMemberKey`
//! - **Messages**: `FeedMessage`, `FeedReadPosition`
//! - **Chain**: `Block`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Caller-supplied identity key (signing address). Opaque; equality is
/// byte-exact.
pub type PublicAddress = String;

/// Monotone block counter assigned by the block producer.
pub type BlockIndex = u64;

/// Opaque 128-bit feed identifier, globally unique and immutable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct FeedId(pub Uuid);

impl FeedId {
    /// Generate a fresh random feed id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero id, never valid for a real feed.
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns true for the all-zero id.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl std::fmt::Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// CLUSTER A: FEEDS (PERSONAL AND CHAT)
// =============================================================================

/// The kind of conversation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedType {
    /// Self-notes feed with exactly one participant.
    Personal,
    /// Two-party feed, both participants are owners.
    Chat,
    /// Multi-party feed with admin-moderated membership and key epochs.
    Group,
}

/// Role of a participant in a personal or chat feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedRole {
    /// Full owner of the feed.
    Owner,
}

/// A personal or chat feed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Unique feed identifier.
    pub feed_id: FeedId,
    /// Display title. May be empty for chat feeds (resolved per-user).
    pub title: String,
    /// Personal or Chat. Groups live in their own table.
    pub feed_type: FeedType,
    /// Block at which the feed was created.
    pub created_at_block: BlockIndex,
    /// Block of the last mutation (message, membership, metadata).
    pub last_updated_at_block: BlockIndex,
}

/// A member record tying an address to a role in a personal/chat feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedParticipant {
    /// Feed this participant belongs to.
    pub feed_id: FeedId,
    /// The participant's identity address.
    pub participant_address: PublicAddress,
    /// Role within the feed.
    pub role: FeedRole,
    /// Per-participant wrap of the feed's shared symmetric key.
    pub encrypted_feed_key: Vec<u8>,
}

// =============================================================================
// CLUSTER B: GROUP FEEDS
// =============================================================================

/// A group feed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFeed {
    /// Unique feed identifier.
    pub feed_id: FeedId,
    /// Display title, non-empty, bounded by configuration.
    pub title: String,
    /// Free-form description, may be empty.
    pub description: String,
    /// Public groups are joinable without an invitation token.
    pub is_public: bool,
    /// Soft-delete marker. Deleted groups block further writes but keep
    /// their history.
    pub is_deleted: bool,
    /// Invite code for public groups, opaque to the core.
    pub invite_code: Option<String>,
    /// Pointer to the highest key generation. Kept equal to
    /// `max(generation)` by the store's atomic epoch persist.
    pub current_key_generation: u64,
    /// Block at which the group was created.
    pub created_at_block: BlockIndex,
    /// Block of the last mutation.
    pub last_updated_at_block: BlockIndex,
}

/// Membership state of a group participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupParticipantType {
    /// Moderates membership and metadata.
    Admin,
    /// Regular member.
    Member,
    /// Denied send-side authorization but still entitled to key epochs.
    Blocked,
    /// Excluded from the group and from all future key epochs.
    Banned,
}

/// A member record in a group feed. One row per (feed, address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFeedParticipant {
    /// Group this participant belongs to.
    pub feed_id: FeedId,
    /// The participant's identity address.
    pub address: PublicAddress,
    /// Current membership state.
    pub participant_type: GroupParticipantType,
    /// Block of the most recent join.
    pub joined_at_block: BlockIndex,
    /// Set when the participant left; `None` while active.
    pub left_at_block: Option<BlockIndex>,
    /// Block of the most recent leave, preserved across rejoins for the
    /// rejoin cooldown.
    pub last_leave_block: Option<BlockIndex>,
}

impl GroupFeedParticipant {
    /// An active participant has not left the group.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.left_at_block.is_none()
    }

    /// Entitled participants receive a wrapped key in every new epoch:
    /// Admin, Member and Blocked, but never Banned.
    #[must_use]
    pub fn is_entitled(&self) -> bool {
        self.is_active()
            && matches!(
                self.participant_type,
                GroupParticipantType::Admin
                    | GroupParticipantType::Member
                    | GroupParticipantType::Blocked
            )
    }
}

// =============================================================================
// CLUSTER C: KEY EPOCHS
// =============================================================================

/// The event that caused a new key generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationTrigger {
    /// A member joined (or the group was created).
    Join,
    /// A member left.
    Leave,
    /// A member was banned.
    Ban,
    /// A member was unbanned.
    Unban,
    /// Explicit rotation request.
    Manual,
}

/// An epoch of a group's symmetric encryption key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGeneration {
    /// Owning group.
    pub feed_id: FeedId,
    /// Monotone epoch number, starting at 0 for group creation.
    pub generation: u64,
    /// First block at which this epoch is valid.
    pub valid_from_block: BlockIndex,
    /// Set when a newer epoch supersedes this one.
    pub valid_to_block: Option<BlockIndex>,
    /// What caused the rotation.
    pub trigger: RotationTrigger,
}

/// The group's symmetric key wrapped to a single member's public
/// encryption key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMemberKey {
    /// Owning group.
    pub feed_id: FeedId,
    /// Epoch this wrap belongs to.
    pub generation: u64,
    /// The member the key is wrapped for.
    pub member_address: PublicAddress,
    /// ECIES ciphertext of the epoch's symmetric key.
    pub encrypted_aes_key: Vec<u8>,
}

// =============================================================================
// CLUSTER D: MESSAGES
// =============================================================================

/// An encrypted message in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMessage {
    /// Unique message identifier.
    pub message_id: Uuid,
    /// Feed the message belongs to.
    pub feed_id: FeedId,
    /// End-to-end encrypted payload, opaque to the node.
    pub ciphertext: Vec<u8>,
    /// Sender's address. May be empty, in which case the message is never
    /// attributable to a sender.
    pub issuer_address: PublicAddress,
    /// Client-supplied timestamp (milliseconds since epoch).
    pub timestamp: u64,
    /// Block the message was indexed at.
    pub block_index: BlockIndex,
    /// Optional message this one replies to.
    pub reply_to: Option<Uuid>,
    /// Optional 32-byte commitment binding the author to the ciphertext.
    pub author_commitment: Option<Vec<u8>>,
    /// Key generation used for encryption. Present iff the feed is a group.
    pub key_generation: Option<u64>,
}

/// Per-user read watermark for a feed. Unique per (user, feed); updates
/// are max-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedReadPosition {
    /// The reading user.
    pub user_address: PublicAddress,
    /// The feed being read.
    pub feed_id: FeedId,
    /// Highest block the user has read up to.
    pub last_read_block: BlockIndex,
}

// =============================================================================
// CLUSTER E: CHAIN
// =============================================================================

/// An ordered batch of validated transactions as drained from a block.
///
/// The core never sees raw chain structures; ordering and chain-level
/// acceptance happen upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Index assigned by the block producer.
    pub index: BlockIndex,
    /// Validated transactions in block order.
    pub transactions: Vec<crate::transactions::ValidatedTransaction>,
}
