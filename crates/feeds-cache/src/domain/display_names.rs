//! Identity display-name hash.
//!
//! Write path: written on identity update. Read path: cache-aside from
//! the identity directory. No TTL.

use crate::errors::CacheResult;
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use shared_types::entities::PublicAddress;
use std::sync::Arc;

/// Single hash of `address → alias`.
pub struct DisplayNamesCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl DisplayNamesCache {
    pub(crate) fn new(backend: Arc<dyn CacheBackend>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self) -> String {
        format!("{}:identity:aliases", self.prefix)
    }

    /// Record an alias.
    pub async fn put(&self, address: &PublicAddress, alias: &str) -> CacheResult<()> {
        self.backend
            .hash_put(&self.key(), address, alias.to_string(), CacheTtl::Persistent)
            .await
    }

    /// The cached alias, `None` on a miss.
    pub async fn get(&self, address: &PublicAddress) -> CacheResult<Option<String>> {
        self.backend.hash_get(&self.key(), address).await
    }
}
