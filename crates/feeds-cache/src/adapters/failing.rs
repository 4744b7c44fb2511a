//! A backend that can be switched into a failing state.
//!
//! Used to exercise the graceful-degradation contract: handlers must
//! survive cache outages, read paths must fall back to the store.

use crate::errors::{CacheError, CacheResult};
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Wraps another backend; while `failing` is set every operation
/// returns `Unavailable`.
pub struct FailingCacheBackend {
    inner: Arc<dyn CacheBackend>,
    failing: AtomicBool,
}

impl FailingCacheBackend {
    /// Wrap a healthy backend.
    pub fn new(inner: Arc<dyn CacheBackend>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    /// Flip the outage switch.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> CacheResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("injected outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    async fn get_value(&self, key: &str) -> CacheResult<Option<String>> {
        self.check()?;
        self.inner.get_value(key).await
    }

    async fn put_value(&self, key: &str, value: String, ttl: CacheTtl) -> CacheResult<()> {
        self.check()?;
        self.inner.put_value(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn set_add(&self, key: &str, member: String, ttl: CacheTtl) -> CacheResult<()> {
        self.check()?;
        self.inner.set_add(key, member, ttl).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()> {
        self.check()?;
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> CacheResult<Option<Vec<String>>> {
        self.check()?;
        self.inner.set_members(key).await
    }

    async fn set_put(&self, key: &str, members: Vec<String>, ttl: CacheTtl) -> CacheResult<()> {
        self.check()?;
        self.inner.set_put(key, members, ttl).await
    }

    async fn hash_put(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: CacheTtl,
    ) -> CacheResult<()> {
        self.check()?;
        self.inner.hash_put(key, field, value, ttl).await
    }

    async fn hash_put_numeric_max(
        &self,
        key: &str,
        field: &str,
        value: u64,
        ttl: CacheTtl,
    ) -> CacheResult<u64> {
        self.check()?;
        self.inner.hash_put_numeric_max(key, field, value, ttl).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        self.check()?;
        self.inner.hash_get(key, field).await
    }

    async fn hash_delete(&self, key: &str, field: &str) -> CacheResult<()> {
        self.check()?;
        self.inner.hash_delete(key, field).await
    }

    async fn hash_entries(&self, key: &str) -> CacheResult<Option<Vec<(String, String)>>> {
        self.check()?;
        self.inner.hash_entries(key).await
    }

    async fn hash_put_all(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: CacheTtl,
    ) -> CacheResult<()> {
        self.check()?;
        self.inner.hash_put_all(key, fields, ttl).await
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: String,
        cap: usize,
        ttl: CacheTtl,
    ) -> CacheResult<()> {
        self.check()?;
        self.inner.list_push_capped(key, value, cap, ttl).await
    }

    async fn list_put(&self, key: &str, values: Vec<String>, ttl: CacheTtl) -> CacheResult<()> {
        self.check()?;
        self.inner.list_put(key, values, ttl).await
    }

    async fn list_range(&self, key: &str) -> CacheResult<Option<Vec<String>>> {
        self.check()?;
        self.inner.list_range(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCacheBackend;

    #[tokio::test]
    async fn test_outage_switch() {
        let backend = FailingCacheBackend::new(Arc::new(InMemoryCacheBackend::new()));

        backend
            .put_value("k", "v".to_string(), CacheTtl::Session)
            .await
            .unwrap();

        backend.set_failing(true);
        assert!(matches!(
            backend.get_value("k").await,
            Err(CacheError::Unavailable(_))
        ));

        backend.set_failing(false);
        assert_eq!(backend.get_value("k").await.unwrap(), Some("v".to_string()));
    }
}
