//! # Transaction Wire Format
//!
//! Self-describing JSON transactions: a 128-bit kind tag, a kind-specific
//! payload, the submitter's signature and, once content validation has
//! passed, the validator's signature.
//!
//! The signed and validated envelopes are structurally identical apart
//! from the validator signature slot. Only validated transactions reach
//! the indexing dispatcher.

use crate::entities::{BlockIndex, FeedId, PublicAddress, RotationTrigger};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, Bytes};
use uuid::Uuid;

// =============================================================================
// KIND TAGS
// =============================================================================

/// All transaction kinds handled by the feeds subsystem.
///
/// Each kind carries a stable 128-bit tag used for codec, validator and
/// handler dispatch. Tags never change once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Create the operator's self-notes feed.
    NewPersonalFeed,
    /// Create a two-party chat feed.
    NewChatFeed,
    /// Create a group feed with its genesis key epoch.
    NewGroupFeed,
    /// Append a message to a personal or chat feed.
    NewFeedMessage,
    /// Append a message to a group feed.
    NewGroupFeedMessage,
    /// Join a group (self-affecting).
    JoinGroupFeed,
    /// Leave a group (self-affecting).
    LeaveGroupFeed,
    /// Admin adds a member.
    AddMemberToGroupFeed,
    /// Admin bans a member.
    BanFromGroupFeed,
    /// Admin unbans a member.
    UnbanFromGroupFeed,
    /// Admin blocks a member.
    BlockMember,
    /// Admin unblocks a member.
    UnblockMember,
    /// Admin promotes a member to admin.
    PromoteToAdmin,
    /// Sole admin dissolves the group.
    DeleteGroupFeed,
    /// Admin retitles the group.
    UpdateGroupFeedTitle,
    /// Admin updates the group description.
    UpdateGroupFeedDescription,
    /// Persist a new key generation.
    GroupFeedKeyRotation,
}

impl TransactionKind {
    /// Every kind, in declaration order. Used to build the dispatch tables.
    pub const ALL: [TransactionKind; 17] = [
        Self::NewPersonalFeed,
        Self::NewChatFeed,
        Self::NewGroupFeed,
        Self::NewFeedMessage,
        Self::NewGroupFeedMessage,
        Self::JoinGroupFeed,
        Self::LeaveGroupFeed,
        Self::AddMemberToGroupFeed,
        Self::BanFromGroupFeed,
        Self::UnbanFromGroupFeed,
        Self::BlockMember,
        Self::UnblockMember,
        Self::PromoteToAdmin,
        Self::DeleteGroupFeed,
        Self::UpdateGroupFeedTitle,
        Self::UpdateGroupFeedDescription,
        Self::GroupFeedKeyRotation,
    ];

    /// The stable 128-bit tag for this kind.
    #[must_use]
    pub const fn tag(self) -> Uuid {
        match self {
            Self::NewPersonalFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a1),
            Self::NewChatFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a2),
            Self::NewGroupFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a3),
            Self::NewFeedMessage => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a4),
            Self::NewGroupFeedMessage => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a5),
            Self::JoinGroupFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a6),
            Self::LeaveGroupFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a7),
            Self::AddMemberToGroupFeed => {
                Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a8)
            }
            Self::BanFromGroupFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70a9),
            Self::UnbanFromGroupFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70aa),
            Self::BlockMember => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70ab),
            Self::UnblockMember => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70ac),
            Self::PromoteToAdmin => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70ad),
            Self::DeleteGroupFeed => Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70ae),
            Self::UpdateGroupFeedTitle => {
                Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70af)
            }
            Self::UpdateGroupFeedDescription => {
                Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70b0)
            }
            Self::GroupFeedKeyRotation => {
                Uuid::from_u128(0x5d02_c2f1_91f4_4b8e_a1c3_6f0d_2b11_70b1)
            }
        }
    }

    /// Resolve a kind from its tag.
    #[must_use]
    pub fn from_tag(tag: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Stable human-readable name, matching the variant.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NewPersonalFeed => "NewPersonalFeed",
            Self::NewChatFeed => "NewChatFeed",
            Self::NewGroupFeed => "NewGroupFeed",
            Self::NewFeedMessage => "NewFeedMessage",
            Self::NewGroupFeedMessage => "NewGroupFeedMessage",
            Self::JoinGroupFeed => "JoinGroupFeed",
            Self::LeaveGroupFeed => "LeaveGroupFeed",
            Self::AddMemberToGroupFeed => "AddMemberToGroupFeed",
            Self::BanFromGroupFeed => "BanFromGroupFeed",
            Self::UnbanFromGroupFeed => "UnbanFromGroupFeed",
            Self::BlockMember => "BlockMember",
            Self::UnblockMember => "UnblockMember",
            Self::PromoteToAdmin => "PromoteToAdmin",
            Self::DeleteGroupFeed => "DeleteGroupFeed",
            Self::UpdateGroupFeedTitle => "UpdateGroupFeedTitle",
            Self::UpdateGroupFeedDescription => "UpdateGroupFeedDescription",
            Self::GroupFeedKeyRotation => "GroupFeedKeyRotation",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Payload for `NewPersonalFeed`. The creator is the user signatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPersonalFeedPayload {
    /// Fresh feed id chosen by the creator.
    pub feed_id: FeedId,
    /// The feed key wrapped to the creator's own encryption key.
    pub encrypted_feed_key: Vec<u8>,
}

/// One side of a chat feed: an address and its wrap of the shared key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatParticipantSlot {
    /// Participant address.
    pub address: PublicAddress,
    /// The chat key wrapped to this participant's encryption key.
    pub encrypted_feed_key: Vec<u8>,
}

/// Payload for `NewChatFeed`. Exactly two participants, both owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChatFeedPayload {
    /// Fresh feed id chosen by the creator.
    pub feed_id: FeedId,
    /// The two parties of the chat.
    pub participants: Vec<ChatParticipantSlot>,
}

/// A per-member wrap of a group epoch key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeySlot {
    /// The member the key is wrapped for.
    pub member_address: PublicAddress,
    /// ECIES ciphertext of the epoch key.
    pub encrypted_aes_key: Vec<u8>,
}

/// Payload for `NewGroupFeed`. The creator (signatory) becomes Admin,
/// all other initial participants become Members, and `encrypted_keys`
/// seeds key generation 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroupFeedPayload {
    /// Fresh feed id chosen by the creator.
    pub feed_id: FeedId,
    /// Group title, non-empty and bounded.
    pub title: String,
    /// Group description, may be empty.
    pub description: String,
    /// Public groups are joinable without an invitation token.
    pub is_public: bool,
    /// Initial participant addresses, creator included.
    pub participants: Vec<PublicAddress>,
    /// Key generation 0 wraps, one per initial participant.
    pub encrypted_keys: Vec<EncryptedKeySlot>,
}

/// Payload for `NewFeedMessage` (personal and chat feeds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedMessagePayload {
    /// Target feed.
    pub feed_id: FeedId,
    /// Client-chosen message id.
    pub message_id: Uuid,
    /// End-to-end encrypted message body.
    pub ciphertext: Vec<u8>,
    /// Client timestamp (milliseconds since epoch).
    pub timestamp: u64,
    /// Optional message being replied to.
    pub reply_to: Option<Uuid>,
    /// Optional 32-byte author commitment.
    pub author_commitment: Option<Vec<u8>>,
}

/// Payload for `NewGroupFeedMessage`. Identical to a feed message plus
/// the key generation the ciphertext was produced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroupFeedMessagePayload {
    /// Target group.
    pub feed_id: FeedId,
    /// Client-chosen message id.
    pub message_id: Uuid,
    /// End-to-end encrypted message body.
    pub ciphertext: Vec<u8>,
    /// Client timestamp (milliseconds since epoch).
    pub timestamp: u64,
    /// Optional message being replied to.
    pub reply_to: Option<Uuid>,
    /// Optional 32-byte author commitment.
    pub author_commitment: Option<Vec<u8>>,
    /// Key generation used to encrypt the body. Must fall inside the
    /// acceptance window at validation time.
    pub key_generation: u64,
}

/// Payload for `JoinGroupFeed`. The subject is the user signatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroupFeedPayload {
    /// Target group.
    pub feed_id: FeedId,
    /// Required for private groups; content is opaque to the core.
    pub invitation_token: Option<String>,
}

/// Payload for `LeaveGroupFeed`. The subject is the user signatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveGroupFeedPayload {
    /// Target group.
    pub feed_id: FeedId,
}

/// Payload for `AddMemberToGroupFeed`. The signatory is an admin; the
/// admin supplies the new member's public encryption address so the
/// rotation engine can wrap the next epoch key without a directory
/// round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMemberToGroupFeedPayload {
    /// Target group.
    pub feed_id: FeedId,
    /// The member being added.
    pub member_address: PublicAddress,
    /// The new member's public encryption address.
    pub member_encrypt_address: String,
}

/// Shared payload for the admin moderation actions
/// (`BanFromGroupFeed`, `UnbanFromGroupFeed`, `BlockMember`,
/// `UnblockMember`, `PromoteToAdmin`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupModerationPayload {
    /// Target group.
    pub feed_id: FeedId,
    /// The member the action applies to.
    pub member_address: PublicAddress,
}

/// Payload for `DeleteGroupFeed`. The signatory must be the only
/// remaining admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteGroupFeedPayload {
    /// Target group.
    pub feed_id: FeedId,
}

/// Payload for `UpdateGroupFeedTitle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGroupFeedTitlePayload {
    /// Target group.
    pub feed_id: FeedId,
    /// New title, non-empty and bounded.
    pub title: String,
}

/// Payload for `UpdateGroupFeedDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGroupFeedDescriptionPayload {
    /// Target group.
    pub feed_id: FeedId,
    /// New description, may be empty.
    pub description: String,
}

/// Payload for `GroupFeedKeyRotation`: a complete new key epoch ready to
/// persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFeedKeyRotationPayload {
    /// Target group.
    pub feed_id: FeedId,
    /// The epoch being created. Always `previous_generation + 1`.
    pub new_generation: u64,
    /// The epoch being superseded.
    pub previous_generation: u64,
    /// First block the new epoch is valid from.
    pub valid_from_block: BlockIndex,
    /// What caused the rotation.
    pub trigger: RotationTrigger,
    /// One wrap per entitled member.
    pub encrypted_keys: Vec<EncryptedKeySlot>,
}

/// Tagged union over every transaction payload.
///
/// The wire representation carries the kind tag separately; parsing into
/// this enum is the codec registry's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionPayload {
    /// See [`NewPersonalFeedPayload`].
    NewPersonalFeed(NewPersonalFeedPayload),
    /// See [`NewChatFeedPayload`].
    NewChatFeed(NewChatFeedPayload),
    /// See [`NewGroupFeedPayload`].
    NewGroupFeed(NewGroupFeedPayload),
    /// See [`NewFeedMessagePayload`].
    NewFeedMessage(NewFeedMessagePayload),
    /// See [`NewGroupFeedMessagePayload`].
    NewGroupFeedMessage(NewGroupFeedMessagePayload),
    /// See [`JoinGroupFeedPayload`].
    JoinGroupFeed(JoinGroupFeedPayload),
    /// See [`LeaveGroupFeedPayload`].
    LeaveGroupFeed(LeaveGroupFeedPayload),
    /// See [`AddMemberToGroupFeedPayload`].
    AddMemberToGroupFeed(AddMemberToGroupFeedPayload),
    /// See [`GroupModerationPayload`].
    BanFromGroupFeed(GroupModerationPayload),
    /// See [`GroupModerationPayload`].
    UnbanFromGroupFeed(GroupModerationPayload),
    /// See [`GroupModerationPayload`].
    BlockMember(GroupModerationPayload),
    /// See [`GroupModerationPayload`].
    UnblockMember(GroupModerationPayload),
    /// See [`GroupModerationPayload`].
    PromoteToAdmin(GroupModerationPayload),
    /// See [`DeleteGroupFeedPayload`].
    DeleteGroupFeed(DeleteGroupFeedPayload),
    /// See [`UpdateGroupFeedTitlePayload`].
    UpdateGroupFeedTitle(UpdateGroupFeedTitlePayload),
    /// See [`UpdateGroupFeedDescriptionPayload`].
    UpdateGroupFeedDescription(UpdateGroupFeedDescriptionPayload),
    /// See [`GroupFeedKeyRotationPayload`].
    GroupFeedKeyRotation(GroupFeedKeyRotationPayload),
}

impl TransactionPayload {
    /// The kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        match self {
            Self::NewPersonalFeed(_) => TransactionKind::NewPersonalFeed,
            Self::NewChatFeed(_) => TransactionKind::NewChatFeed,
            Self::NewGroupFeed(_) => TransactionKind::NewGroupFeed,
            Self::NewFeedMessage(_) => TransactionKind::NewFeedMessage,
            Self::NewGroupFeedMessage(_) => TransactionKind::NewGroupFeedMessage,
            Self::JoinGroupFeed(_) => TransactionKind::JoinGroupFeed,
            Self::LeaveGroupFeed(_) => TransactionKind::LeaveGroupFeed,
            Self::AddMemberToGroupFeed(_) => TransactionKind::AddMemberToGroupFeed,
            Self::BanFromGroupFeed(_) => TransactionKind::BanFromGroupFeed,
            Self::UnbanFromGroupFeed(_) => TransactionKind::UnbanFromGroupFeed,
            Self::BlockMember(_) => TransactionKind::BlockMember,
            Self::UnblockMember(_) => TransactionKind::UnblockMember,
            Self::PromoteToAdmin(_) => TransactionKind::PromoteToAdmin,
            Self::DeleteGroupFeed(_) => TransactionKind::DeleteGroupFeed,
            Self::UpdateGroupFeedTitle(_) => TransactionKind::UpdateGroupFeedTitle,
            Self::UpdateGroupFeedDescription(_) => TransactionKind::UpdateGroupFeedDescription,
            Self::GroupFeedKeyRotation(_) => TransactionKind::GroupFeedKeyRotation,
        }
    }

    /// The feed this payload targets.
    #[must_use]
    pub const fn feed_id(&self) -> FeedId {
        match self {
            Self::NewPersonalFeed(p) => p.feed_id,
            Self::NewChatFeed(p) => p.feed_id,
            Self::NewGroupFeed(p) => p.feed_id,
            Self::NewFeedMessage(p) => p.feed_id,
            Self::NewGroupFeedMessage(p) => p.feed_id,
            Self::JoinGroupFeed(p) => p.feed_id,
            Self::LeaveGroupFeed(p) => p.feed_id,
            Self::AddMemberToGroupFeed(p) => p.feed_id,
            Self::BanFromGroupFeed(p)
            | Self::UnbanFromGroupFeed(p)
            | Self::BlockMember(p)
            | Self::UnblockMember(p)
            | Self::PromoteToAdmin(p) => p.feed_id,
            Self::DeleteGroupFeed(p) => p.feed_id,
            Self::UpdateGroupFeedTitle(p) => p.feed_id,
            Self::UpdateGroupFeedDescription(p) => p.feed_id,
            Self::GroupFeedKeyRotation(p) => p.feed_id,
        }
    }

    /// Serialize the payload into its wire value (the kind-specific JSON
    /// object; the kind tag travels separately).
    pub fn to_wire_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::NewPersonalFeed(p) => serde_json::to_value(p),
            Self::NewChatFeed(p) => serde_json::to_value(p),
            Self::NewGroupFeed(p) => serde_json::to_value(p),
            Self::NewFeedMessage(p) => serde_json::to_value(p),
            Self::NewGroupFeedMessage(p) => serde_json::to_value(p),
            Self::JoinGroupFeed(p) => serde_json::to_value(p),
            Self::LeaveGroupFeed(p) => serde_json::to_value(p),
            Self::AddMemberToGroupFeed(p) => serde_json::to_value(p),
            Self::BanFromGroupFeed(p)
            | Self::UnbanFromGroupFeed(p)
            | Self::BlockMember(p)
            | Self::UnblockMember(p)
            | Self::PromoteToAdmin(p) => serde_json::to_value(p),
            Self::DeleteGroupFeed(p) => serde_json::to_value(p),
            Self::UpdateGroupFeedTitle(p) => serde_json::to_value(p),
            Self::UpdateGroupFeedDescription(p) => serde_json::to_value(p),
            Self::GroupFeedKeyRotation(p) => serde_json::to_value(p),
        }
    }

    /// Parse a wire value into the typed payload for `kind`.
    pub fn from_wire_value(
        kind: TransactionKind,
        value: Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            TransactionKind::NewPersonalFeed => {
                Self::NewPersonalFeed(serde_json::from_value(value)?)
            }
            TransactionKind::NewChatFeed => Self::NewChatFeed(serde_json::from_value(value)?),
            TransactionKind::NewGroupFeed => Self::NewGroupFeed(serde_json::from_value(value)?),
            TransactionKind::NewFeedMessage => Self::NewFeedMessage(serde_json::from_value(value)?),
            TransactionKind::NewGroupFeedMessage => {
                Self::NewGroupFeedMessage(serde_json::from_value(value)?)
            }
            TransactionKind::JoinGroupFeed => Self::JoinGroupFeed(serde_json::from_value(value)?),
            TransactionKind::LeaveGroupFeed => Self::LeaveGroupFeed(serde_json::from_value(value)?),
            TransactionKind::AddMemberToGroupFeed => {
                Self::AddMemberToGroupFeed(serde_json::from_value(value)?)
            }
            TransactionKind::BanFromGroupFeed => {
                Self::BanFromGroupFeed(serde_json::from_value(value)?)
            }
            TransactionKind::UnbanFromGroupFeed => {
                Self::UnbanFromGroupFeed(serde_json::from_value(value)?)
            }
            TransactionKind::BlockMember => Self::BlockMember(serde_json::from_value(value)?),
            TransactionKind::UnblockMember => Self::UnblockMember(serde_json::from_value(value)?),
            TransactionKind::PromoteToAdmin => Self::PromoteToAdmin(serde_json::from_value(value)?),
            TransactionKind::DeleteGroupFeed => {
                Self::DeleteGroupFeed(serde_json::from_value(value)?)
            }
            TransactionKind::UpdateGroupFeedTitle => {
                Self::UpdateGroupFeedTitle(serde_json::from_value(value)?)
            }
            TransactionKind::UpdateGroupFeedDescription => {
                Self::UpdateGroupFeedDescription(serde_json::from_value(value)?)
            }
            TransactionKind::GroupFeedKeyRotation => {
                Self::GroupFeedKeyRotation(serde_json::from_value(value)?)
            }
        })
    }
}

// =============================================================================
// SIGNATURES AND ENVELOPES
// =============================================================================

/// A signatory and its Ed25519 signature over canonical transaction bytes.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// Address of the signer.
    pub signatory: PublicAddress,
    /// 64-byte Ed25519 signature.
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 64],
}

/// The raw wire shape shared by signed and validated transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    /// 128-bit kind tag.
    pub kind: Uuid,
    /// Kind-specific payload object.
    pub payload: Value,
    /// The submitter's signature.
    pub user_signature: TransactionSignature,
    /// Present once content validation has attached it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_signature: Option<TransactionSignature>,
}

/// A transaction carrying only the submitter's signature. Input to the
/// content validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Typed payload.
    pub payload: TransactionPayload,
    /// The submitter's signature.
    pub user_signature: TransactionSignature,
}

/// A transaction carrying both the submitter's and a validator's
/// signature. Only these reach the indexing dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    /// Typed payload.
    pub payload: TransactionPayload,
    /// The submitter's signature.
    pub user_signature: TransactionSignature,
    /// The content validator's signature.
    pub validator_signature: TransactionSignature,
}

/// Canonical bytes the submitter signs: the JSON document
/// `{"kind": <tag>, "payload": <payload>}` with sorted keys.
pub fn user_signing_bytes(
    kind: TransactionKind,
    payload: &Value,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&serde_json::json!({
        "kind": kind.tag(),
        "payload": payload,
    }))
}

/// Canonical bytes the validator signs: the user-signed document plus the
/// user signature.
pub fn validator_signing_bytes(
    kind: TransactionKind,
    payload: &Value,
    user_signature: &TransactionSignature,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&serde_json::json!({
        "kind": kind.tag(),
        "payload": payload,
        "user_signature": user_signature,
    }))
}

impl SignedTransaction {
    /// The transaction's kind.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.payload.kind()
    }

    /// Convert into the wire shape.
    pub fn to_raw(&self) -> Result<RawTransaction, serde_json::Error> {
        Ok(RawTransaction {
            kind: self.kind().tag(),
            payload: self.payload.to_wire_value()?,
            user_signature: self.user_signature.clone(),
            validator_signature: None,
        })
    }
}

impl ValidatedTransaction {
    /// The transaction's kind.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.payload.kind()
    }

    /// Convert into the wire shape.
    pub fn to_raw(&self) -> Result<RawTransaction, serde_json::Error> {
        Ok(RawTransaction {
            kind: self.kind().tag(),
            payload: self.payload.to_wire_value()?,
            user_signature: self.user_signature.clone(),
            validator_signature: Some(self.validator_signature.clone()),
        })
    }
}

impl Serialize for ValidatedTransaction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidatedTransaction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTransaction::deserialize(deserializer)?;
        let kind = TransactionKind::from_tag(raw.kind)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown kind tag {}", raw.kind)))?;
        let payload = TransactionPayload::from_wire_value(kind, raw.payload)
            .map_err(serde::de::Error::custom)?;
        let validator_signature = raw
            .validator_signature
            .ok_or_else(|| serde::de::Error::custom("missing validator signature"))?;
        Ok(Self {
            payload,
            user_signature: raw.user_signature,
            validator_signature,
        })
    }
}
