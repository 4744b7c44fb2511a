//! Post-commit group invariant audit.
//!
//! After every group-mutating transaction the dispatcher re-reads the
//! group and asserts the epoch and membership invariants. A violation
//! is a fatal indexing bug: the worker halts and the node must be
//! investigated.

use crate::errors::IndexingError;
use feeds_store::FeedsStore;
use shared_types::entities::FeedId;
use std::collections::HashSet;

/// Verify the group's invariants, skipping silently when the group does
/// not exist (the triggering transaction may have been a no-op).
pub async fn verify_group_invariants(
    store: &dyn FeedsStore,
    feed_id: FeedId,
) -> Result<(), IndexingError> {
    let Some(group) = store.get_group_feed(feed_id).await? else {
        return Ok(());
    };

    let generations = store.list_key_generations(feed_id).await?;
    let max_generation = generations.iter().map(|g| g.generation).max();

    // The pointer always names the highest persisted epoch.
    if max_generation != Some(group.current_key_generation) {
        return Err(IndexingError::InvariantViolation {
            feed_id,
            detail: format!(
                "current_key_generation {} but max persisted is {:?}",
                group.current_key_generation, max_generation
            ),
        });
    }

    // Exactly one open epoch, and it is the current one.
    let open: Vec<u64> = generations
        .iter()
        .filter(|g| g.valid_to_block.is_none())
        .map(|g| g.generation)
        .collect();
    if open.len() != 1 || open[0] != group.current_key_generation {
        return Err(IndexingError::InvariantViolation {
            feed_id,
            detail: format!("open epochs {open:?}, current {}", group.current_key_generation),
        });
    }

    // One row per address; at most one active row per (feed, address).
    let participants = store.list_group_participants(feed_id).await?;
    let mut addresses = HashSet::new();
    for participant in &participants {
        if !addresses.insert(participant.address.as_str()) {
            return Err(IndexingError::InvariantViolation {
                feed_id,
                detail: format!("duplicate participant row for {:?}", participant.address),
            });
        }
    }

    // Every wrapped key in the current epoch belongs to a known
    // participant.
    let keys = store
        .list_encrypted_member_keys(feed_id, group.current_key_generation)
        .await?;
    for key in &keys {
        if !addresses.contains(key.member_address.as_str()) {
            return Err(IndexingError::InvariantViolation {
                feed_id,
                detail: format!(
                    "epoch {} keyed for non-participant {:?}",
                    group.current_key_generation, key.member_address
                ),
            });
        }
    }

    Ok(())
}
