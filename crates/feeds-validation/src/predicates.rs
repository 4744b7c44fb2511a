//! # Reusable Validation Predicates
//!
//! The building blocks the per-kind validators compose: group liveness,
//! admin authority, join/rejoin target state, the rejoin cooldown, the
//! key-generation acceptance window, and field constraints.

use feeds_store::FeedsStore;
use shared_types::entities::{
    BlockIndex, FeedId, GroupFeed, GroupFeedParticipant, GroupParticipantType, KeyGeneration,
    PublicAddress,
};
use shared_types::transactions::EncryptedKeySlot;
use std::collections::HashSet;

/// The target group, provided it exists and has not been dissolved.
/// Every admin action and every self-affecting group action requires
/// this.
pub async fn live_group(store: &dyn FeedsStore, feed_id: FeedId) -> Option<GroupFeed> {
    match store.get_group_feed(feed_id).await {
        Ok(Some(group)) if !group.is_deleted => Some(group),
        _ => None,
    }
}

/// Is `address` currently an active admin of the group?
pub async fn is_active_admin(
    store: &dyn FeedsStore,
    feed_id: FeedId,
    address: &PublicAddress,
) -> bool {
    matches!(
        store.get_group_participant(feed_id, address).await,
        Ok(Some(p)) if p.is_active() && p.participant_type == GroupParticipantType::Admin
    )
}

/// The participant row for (feed, address), if the lookup succeeds.
pub async fn participant_row(
    store: &dyn FeedsStore,
    feed_id: FeedId,
    address: &PublicAddress,
) -> Option<GroupFeedParticipant> {
    store
        .get_group_participant(feed_id, address)
        .await
        .ok()
        .flatten()
}

/// May this address (re)enter the group? True when there is no
/// participant row at all, or only a left one that is not banned.
#[must_use]
pub fn may_enter(row: Option<&GroupFeedParticipant>) -> bool {
    match row {
        None => true,
        Some(p) => !p.is_active() && p.participant_type != GroupParticipantType::Banned,
    }
}

/// Has the rejoin cooldown elapsed? A row without a recorded leave has
/// nothing to cool down from. Rejoining at exactly
/// `last_leave + cooldown` is allowed.
#[must_use]
pub fn cooldown_elapsed(
    row: Option<&GroupFeedParticipant>,
    cooldown_blocks: BlockIndex,
    current_block: BlockIndex,
) -> bool {
    match row.and_then(|p| p.last_leave_block) {
        Some(last_leave) => current_block.saturating_sub(last_leave) >= cooldown_blocks,
        None => true,
    }
}

/// Group-message acceptance window: the current generation always
/// passes; the previous one passes only while the current epoch is
/// younger than the grace period.
#[must_use]
pub fn keygen_window_ok(
    current: &KeyGeneration,
    message_generation: u64,
    current_block: BlockIndex,
    grace_blocks: BlockIndex,
) -> bool {
    if message_generation == current.generation {
        return true;
    }
    message_generation + 1 == current.generation
        && current_block.saturating_sub(current.valid_from_block) < grace_blocks
}

/// Title constraint: non-empty and at most `max` UTF-8 code points.
#[must_use]
pub fn title_ok(title: &str, max: usize) -> bool {
    !title.is_empty() && title.chars().count() <= max
}

/// All addresses non-empty and pairwise distinct.
#[must_use]
pub fn addresses_distinct_and_nonempty(addresses: &[PublicAddress]) -> bool {
    let mut seen = HashSet::new();
    addresses
        .iter()
        .all(|a| !a.is_empty() && seen.insert(a.as_str()))
}

/// Author commitment constraint: absent, or exactly 32 bytes.
#[must_use]
pub fn author_commitment_ok(commitment: Option<&Vec<u8>>) -> bool {
    commitment.map_or(true, |c| c.len() == 32)
}

/// Encrypted key slots: non-empty set, non-empty keys, distinct
/// non-empty addresses.
#[must_use]
pub fn encrypted_keys_ok(slots: &[EncryptedKeySlot]) -> bool {
    if slots.is_empty() {
        return false;
    }
    let mut seen = HashSet::new();
    slots.iter().all(|slot| {
        !slot.member_address.is_empty()
            && !slot.encrypted_aes_key.is_empty()
            && seen.insert(slot.member_address.as_str())
    })
}
