//! Per-feed key-generation document cache.
//!
//! Write path: invalidated on every rotation. Read path: cache-aside,
//! populated by the key-generation read path. TTL: session.

use crate::errors::{CacheError, CacheResult};
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use serde::{Deserialize, Serialize};
use shared_types::entities::{
    BlockIndex, EncryptedMemberKey, FeedId, KeyGeneration, PublicAddress, RotationTrigger,
};
use std::sync::Arc;

/// One epoch as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerationView {
    /// Epoch number.
    pub generation: u64,
    /// First block the epoch is valid from.
    pub valid_from_block: BlockIndex,
    /// Block the epoch was superseded at, if any.
    pub valid_to_block: Option<BlockIndex>,
    /// What caused the rotation.
    pub trigger: RotationTrigger,
    /// Wrapped epoch keys per member.
    pub encrypted_keys: Vec<MemberKeyView>,
}

/// One wrapped key as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberKeyView {
    /// The member the key is wrapped for.
    pub member_address: PublicAddress,
    /// ECIES ciphertext of the epoch key.
    pub encrypted_aes_key: Vec<u8>,
}

/// The whole per-feed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerationDocument {
    /// The feed the document describes.
    pub feed_id: FeedId,
    /// The group's current epoch.
    pub current_generation: u64,
    /// Every epoch, ascending.
    pub generations: Vec<KeyGenerationView>,
}

impl KeyGenerationView {
    /// Combine an epoch row with its member-key rows.
    #[must_use]
    pub fn from_rows(generation: &KeyGeneration, keys: &[EncryptedMemberKey]) -> Self {
        Self {
            generation: generation.generation,
            valid_from_block: generation.valid_from_block,
            valid_to_block: generation.valid_to_block,
            trigger: generation.trigger,
            encrypted_keys: keys
                .iter()
                .map(|k| MemberKeyView {
                    member_address: k.member_address.clone(),
                    encrypted_aes_key: k.encrypted_aes_key.clone(),
                })
                .collect(),
        }
    }
}

/// JSON document per feed.
pub struct KeyGenerationsCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl KeyGenerationsCache {
    pub(crate) fn new(backend: Arc<dyn CacheBackend>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, feed_id: FeedId) -> String {
        format!("{}:feeds:keygens:{feed_id}", self.prefix)
    }

    /// Store the document after a read-path rebuild.
    pub async fn put(&self, document: &KeyGenerationDocument) -> CacheResult<()> {
        let encoded =
            serde_json::to_string(document).map_err(|e| CacheError::Codec(e.to_string()))?;
        self.backend
            .put_value(&self.key(document.feed_id), encoded, CacheTtl::Session)
            .await
    }

    /// Drop the document; rotations call this synchronously.
    pub async fn invalidate(&self, feed_id: FeedId) -> CacheResult<()> {
        self.backend.delete(&self.key(feed_id)).await
    }

    /// The cached document, `None` on a miss.
    pub async fn get(&self, feed_id: FeedId) -> CacheResult<Option<KeyGenerationDocument>> {
        let Some(encoded) = self.backend.get_value(&self.key(feed_id)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&encoded)
            .map(Some)
            .map_err(|e| CacheError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryCacheBackend;

    fn document(feed_id: FeedId) -> KeyGenerationDocument {
        KeyGenerationDocument {
            feed_id,
            current_generation: 1,
            generations: vec![KeyGenerationView {
                generation: 1,
                valid_from_block: 10,
                valid_to_block: None,
                trigger: RotationTrigger::Join,
                encrypted_keys: vec![MemberKeyView {
                    member_address: "alice".to_string(),
                    encrypted_aes_key: vec![1, 2],
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_put_get_invalidate() {
        let cache = KeyGenerationsCache::new(Arc::new(InMemoryCacheBackend::new()), "test");
        let feed_id = FeedId::generate();
        let doc = document(feed_id);

        cache.put(&doc).await.unwrap();
        assert_eq!(cache.get(feed_id).await.unwrap(), Some(doc));

        cache.invalidate(feed_id).await.unwrap();
        assert_eq!(cache.get(feed_id).await.unwrap(), None);
    }
}
