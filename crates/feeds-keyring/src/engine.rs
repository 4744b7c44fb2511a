//! # Rotation Engine
//!
//! Produces and persists new group key epochs.
//!
//! A rotation generates a fresh 256-bit symmetric key, wraps it with
//! ECIES for every entitled member (Admin, Member and Blocked, never
//! Banned), and hands back a ready-to-persist payload. The plaintext key
//! lives only on this engine's stack frame and is zeroized on every exit
//! path by the key type's drop.

use crate::errors::RotationError;
use feeds_store::FeedsStore;
use shared_crypto::ecies::{self, EncryptionPublicKey};
use shared_crypto::symmetric::SecretKey;
use shared_types::collaborators::IdentityDirectory;
use shared_types::config::FeedsConfig;
use shared_types::entities::{
    BlockIndex, EncryptedMemberKey, FeedId, KeyGeneration, PublicAddress, RotationTrigger,
};
use shared_types::transactions::{EncryptedKeySlot, GroupFeedKeyRotationPayload};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A member entering the group as part of the triggering event.
///
/// Admin adds carry the new member's encryption address in the payload,
/// saving a directory round-trip; plain joins resolve it from the
/// directory like everyone else.
#[derive(Debug, Clone)]
pub struct JoiningMember {
    /// The joining member's identity address.
    pub address: PublicAddress,
    /// Payload-supplied encryption address, if the admin provided one.
    pub encrypt_address: Option<String>,
}

/// Result of a successful rotation.
#[derive(Debug, Clone)]
pub struct RotationOutcome {
    /// The newly created generation number.
    pub generation: u64,
    /// The complete rotation payload (also the wire shape of an explicit
    /// rotation transaction).
    pub payload: GroupFeedKeyRotationPayload,
}

/// Group key rotation engine.
pub struct RotationEngine {
    store: Arc<dyn FeedsStore>,
    identity: Arc<dyn IdentityDirectory>,
    config: FeedsConfig,
}

impl RotationEngine {
    /// Wire up an engine.
    pub fn new(
        store: Arc<dyn FeedsStore>,
        identity: Arc<dyn IdentityDirectory>,
        config: FeedsConfig,
    ) -> Self {
        Self {
            store,
            identity,
            config,
        }
    }

    /// Produce a new key epoch for a group without persisting it.
    ///
    /// The membership delta (`joining`, `leaving`) is applied on top of
    /// the currently entitled participants so the new epoch reflects the
    /// triggering event even though its store mutation may already have
    /// happened.
    pub async fn rotate(
        &self,
        feed_id: FeedId,
        trigger: RotationTrigger,
        joining: Option<JoiningMember>,
        leaving: Option<&PublicAddress>,
        current_block: BlockIndex,
    ) -> Result<RotationOutcome, RotationError> {
        let group = self
            .store
            .get_group_feed(feed_id)
            .await?
            .ok_or(RotationError::UnknownFeed(feed_id))?;
        let previous_generation = group.current_key_generation;

        // Entitled membership with the triggering delta applied.
        let participants = self.store.list_group_participants(feed_id).await?;
        let mut members: Vec<PublicAddress> = participants
            .iter()
            .filter(|p| p.is_entitled())
            .map(|p| p.address.clone())
            .collect();
        if let Some(leaver) = leaving {
            members.retain(|address| address != leaver);
        }
        if let Some(joiner) = &joining {
            if !members.contains(&joiner.address) {
                members.push(joiner.address.clone());
            }
        }

        if members.is_empty() {
            return Err(RotationError::EmptyMembership(feed_id));
        }
        if members.len() > self.config.max_members_per_rotation {
            return Err(RotationError::OversizedMembership {
                count: members.len(),
                max: self.config.max_members_per_rotation,
            });
        }

        // Fresh epoch key; zeroized when this frame unwinds, success or
        // not.
        let epoch_key = SecretKey::generate();

        let mut encrypted_keys = Vec::with_capacity(members.len());
        for address in &members {
            let encrypt_address = self.resolve_encrypt_address(address, joining.as_ref()).await?;
            let recipient = EncryptionPublicKey::from_hex(&encrypt_address).map_err(|e| {
                warn!(member = %address, error = %e, "bad encryption address");
                RotationError::EncryptionFailed(address.clone())
            })?;
            let wrapped =
                ecies::encrypt(&recipient, epoch_key.as_bytes()).map_err(|e| {
                    warn!(member = %address, error = %e, "epoch key wrap failed");
                    RotationError::EncryptionFailed(address.clone())
                })?;
            encrypted_keys.push(EncryptedKeySlot {
                member_address: address.clone(),
                encrypted_aes_key: wrapped,
            });
        }

        let new_generation = previous_generation + 1;
        debug!(
            feed = %feed_id,
            generation = new_generation,
            members = members.len(),
            ?trigger,
            "rotation produced"
        );

        Ok(RotationOutcome {
            generation: new_generation,
            payload: GroupFeedKeyRotationPayload {
                feed_id,
                new_generation,
                previous_generation,
                valid_from_block: current_block,
                trigger,
                encrypted_keys,
            },
        })
    }

    /// Produce a new key epoch and persist it atomically with the
    /// group's `current_key_generation` pointer. On any failure the
    /// store remains at the previous generation.
    pub async fn rotate_and_persist(
        &self,
        feed_id: FeedId,
        trigger: RotationTrigger,
        joining: Option<JoiningMember>,
        leaving: Option<&PublicAddress>,
        current_block: BlockIndex,
    ) -> Result<RotationOutcome, RotationError> {
        let outcome = match self
            .rotate(feed_id, trigger, joining, leaving, current_block)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                murmur_telemetry::KEY_ROTATIONS_FAILED.inc();
                return Err(e);
            }
        };

        let generation = KeyGeneration {
            feed_id,
            generation: outcome.generation,
            valid_from_block: outcome.payload.valid_from_block,
            valid_to_block: None,
            trigger,
        };
        let keys = outcome
            .payload
            .encrypted_keys
            .iter()
            .map(|slot| EncryptedMemberKey {
                feed_id,
                generation: outcome.generation,
                member_address: slot.member_address.clone(),
                encrypted_aes_key: slot.encrypted_aes_key.clone(),
            })
            .collect();

        if let Err(e) = self.store.persist_key_generation(generation, keys).await {
            murmur_telemetry::KEY_ROTATIONS_FAILED.inc();
            return Err(e.into());
        }
        murmur_telemetry::KEY_ROTATIONS_COMPLETED.inc();

        info!(
            feed = %feed_id,
            generation = outcome.generation,
            ?trigger,
            "key rotation persisted"
        );
        Ok(outcome)
    }

    /// Resolve a member's public encryption address, preferring the
    /// payload-supplied one for the joining member. Directory lookups
    /// are bounded; a timeout aborts the whole rotation.
    async fn resolve_encrypt_address(
        &self,
        address: &PublicAddress,
        joining: Option<&JoiningMember>,
    ) -> Result<String, RotationError> {
        if let Some(joiner) = joining {
            if &joiner.address == address {
                if let Some(encrypt_address) = &joiner.encrypt_address {
                    if !encrypt_address.is_empty() {
                        return Ok(encrypt_address.clone());
                    }
                }
            }
        }

        let lookup = self.identity.lookup(address);
        let profile = match tokio::time::timeout(self.config.identity_lookup_timeout, lookup).await
        {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                warn!(member = %address, error = %e, "identity lookup failed during rotation");
                return Err(RotationError::IdentityUnavailable(address.clone()));
            }
            Err(_) => {
                warn!(member = %address, "identity lookup timed out during rotation");
                return Err(RotationError::IdentityUnavailable(address.clone()));
            }
        };

        if profile.public_encrypt_address.is_empty() {
            return Err(RotationError::IdentityUnavailable(address.clone()));
        }
        Ok(profile.public_encrypt_address)
    }
}
