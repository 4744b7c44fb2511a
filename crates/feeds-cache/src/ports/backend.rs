//! The cache backend port.
//!
//! A small key-value surface with sets, hashes and capped lists: the
//! operations the seven derived views need, nothing more. Keys are
//! fully qualified strings carrying the tenant prefix.

use crate::errors::CacheResult;
use crate::ttl::CacheTtl;
use async_trait::async_trait;

/// Process-wide, concurrency-safe cache backend.
///
/// Individual operations are atomic; every write is idempotent or
/// max-wins so the indexing worker and request threads can interleave
/// freely.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    // =========================================================================
    // PLAIN VALUES
    // =========================================================================

    /// Read a value.
    async fn get_value(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a value, replacing any previous structure under the key.
    async fn put_value(&self, key: &str, value: String, ttl: CacheTtl) -> CacheResult<()>;

    /// Drop a key of any structure.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    // =========================================================================
    // SETS
    // =========================================================================

    /// Add one member, creating the set if absent.
    async fn set_add(&self, key: &str, member: String, ttl: CacheTtl) -> CacheResult<()>;

    /// Remove one member. Removing from a missing set is a no-op.
    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()>;

    /// All members; `None` when the key is absent (as opposed to an
    /// empty set).
    async fn set_members(&self, key: &str) -> CacheResult<Option<Vec<String>>>;

    /// Replace the whole set.
    async fn set_put(&self, key: &str, members: Vec<String>, ttl: CacheTtl) -> CacheResult<()>;

    // =========================================================================
    // HASHES
    // =========================================================================

    /// Write one field.
    async fn hash_put(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: CacheTtl,
    ) -> CacheResult<()>;

    /// Write one numeric field, keeping the larger of the existing and
    /// proposed values. Returns the stored value.
    async fn hash_put_numeric_max(
        &self,
        key: &str,
        field: &str,
        value: u64,
        ttl: CacheTtl,
    ) -> CacheResult<u64>;

    /// Read one field.
    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<String>>;

    /// Drop one field. Missing field or key is a no-op.
    async fn hash_delete(&self, key: &str, field: &str) -> CacheResult<()>;

    /// All entries; `None` when the key is absent.
    async fn hash_entries(&self, key: &str) -> CacheResult<Option<Vec<(String, String)>>>;

    /// Replace the whole hash.
    async fn hash_put_all(
        &self,
        key: &str,
        entries: Vec<(String, String)>,
        ttl: CacheTtl,
    ) -> CacheResult<()>;

    // =========================================================================
    // CAPPED LISTS
    // =========================================================================

    /// Append to a list, dropping the oldest entries beyond `cap`.
    async fn list_push_capped(
        &self,
        key: &str,
        value: String,
        cap: usize,
        ttl: CacheTtl,
    ) -> CacheResult<()>;

    /// Replace the whole list (already capped by the caller).
    async fn list_put(&self, key: &str, values: Vec<String>, ttl: CacheTtl) -> CacheResult<()>;

    /// The whole list, oldest first; `None` when the key is absent.
    async fn list_range(&self, key: &str) -> CacheResult<Option<Vec<String>>>;
}
