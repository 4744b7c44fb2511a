//! # In-Memory Cache Backend
//!
//! A single-process backend over one `RwLock`ed map with lazy expiry:
//! reads treat an expired entry as missing and drop it on the next
//! write pass. TTLs are set when a key is created and kept on in-place
//! updates.

use crate::errors::{CacheError, CacheResult};
use crate::ports::CacheBackend;
use crate::ttl::CacheTtl;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tokio::sync::RwLock;

enum Structure {
    Value(String),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
    List(Vec<String>),
}

struct Entry {
    structure: Structure,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(structure: Structure, ttl: CacheTtl) -> Self {
        Self {
            structure,
            expires_at: ttl.duration().map(|d| Instant::now() + d),
        }
    }

    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory implementation of [`CacheBackend`].
#[derive(Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCacheBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys. Test observability.
    pub async fn live_keys(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.expired()).count()
    }
}

fn mismatch(key: &str) -> CacheError {
    CacheError::TypeMismatch {
        key: key.to_string(),
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get_value(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.expired() => match &entry.structure {
                Structure::Value(v) => Ok(Some(v.clone())),
                _ => Err(mismatch(key)),
            },
            _ => Ok(None),
        }
    }

    async fn put_value(&self, key: &str, value: String, ttl: CacheTtl) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry::new(Structure::Value(value), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: String, ttl: CacheTtl) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key).filter(|e| !e.expired()) {
            Some(entry) => match &mut entry.structure {
                Structure::Set(set) => {
                    set.insert(member);
                    Ok(())
                }
                _ => Err(mismatch(key)),
            },
            None => {
                let mut set = HashSet::new();
                set.insert(member);
                entries.insert(key.to_string(), Entry::new(Structure::Set(set), ttl));
                Ok(())
            }
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key).filter(|e| !e.expired()) {
            match &mut entry.structure {
                Structure::Set(set) => {
                    set.remove(member);
                }
                _ => return Err(mismatch(key)),
            }
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> CacheResult<Option<Vec<String>>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.expired() => match &entry.structure {
                Structure::Set(set) => {
                    let mut members: Vec<String> = set.iter().cloned().collect();
                    members.sort();
                    Ok(Some(members))
                }
                _ => Err(mismatch(key)),
            },
            _ => Ok(None),
        }
    }

    async fn set_put(&self, key: &str, members: Vec<String>, ttl: CacheTtl) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry::new(Structure::Set(members.into_iter().collect()), ttl),
        );
        Ok(())
    }

    async fn hash_put(
        &self,
        key: &str,
        field: &str,
        value: String,
        ttl: CacheTtl,
    ) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key).filter(|e| !e.expired()) {
            Some(entry) => match &mut entry.structure {
                Structure::Hash(hash) => {
                    hash.insert(field.to_string(), value);
                    Ok(())
                }
                _ => Err(mismatch(key)),
            },
            None => {
                let mut hash = HashMap::new();
                hash.insert(field.to_string(), value);
                entries.insert(key.to_string(), Entry::new(Structure::Hash(hash), ttl));
                Ok(())
            }
        }
    }

    async fn hash_put_numeric_max(
        &self,
        key: &str,
        field: &str,
        value: u64,
        ttl: CacheTtl,
    ) -> CacheResult<u64> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if e.expired() {
                    *e = Entry::new(Structure::Hash(HashMap::new()), ttl);
                }
            })
            .or_insert_with(|| Entry::new(Structure::Hash(HashMap::new()), ttl));

        match &mut entry.structure {
            Structure::Hash(hash) => {
                let existing = hash
                    .get(field)
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0);
                let merged = existing.max(value);
                hash.insert(field.to_string(), merged.to_string());
                Ok(merged)
            }
            _ => Err(mismatch(key)),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.expired() => match &entry.structure {
                Structure::Hash(hash) => Ok(hash.get(field).cloned()),
                _ => Err(mismatch(key)),
            },
            _ => Ok(None),
        }
    }

    async fn hash_delete(&self, key: &str, field: &str) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key).filter(|e| !e.expired()) {
            match &mut entry.structure {
                Structure::Hash(hash) => {
                    hash.remove(field);
                }
                _ => return Err(mismatch(key)),
            }
        }
        Ok(())
    }

    async fn hash_entries(&self, key: &str) -> CacheResult<Option<Vec<(String, String)>>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.expired() => match &entry.structure {
                Structure::Hash(hash) => {
                    let mut pairs: Vec<(String, String)> =
                        hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    pairs.sort();
                    Ok(Some(pairs))
                }
                _ => Err(mismatch(key)),
            },
            _ => Ok(None),
        }
    }

    async fn hash_put_all(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: CacheTtl,
    ) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry::new(Structure::Hash(fields.into_iter().collect()), ttl),
        );
        Ok(())
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: String,
        cap: usize,
        ttl: CacheTtl,
    ) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key).filter(|e| !e.expired()) {
            Some(entry) => match &mut entry.structure {
                Structure::List(list) => {
                    list.push(value);
                    if list.len() > cap {
                        let excess = list.len() - cap;
                        list.drain(..excess);
                    }
                    Ok(())
                }
                _ => Err(mismatch(key)),
            },
            None => {
                entries.insert(
                    key.to_string(),
                    Entry::new(Structure::List(vec![value]), ttl),
                );
                Ok(())
            }
        }
    }

    async fn list_put(&self, key: &str, values: Vec<String>, ttl: CacheTtl) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry::new(Structure::List(values), ttl));
        Ok(())
    }

    async fn list_range(&self, key: &str) -> CacheResult<Option<Vec<String>>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.expired() => match &entry.structure {
                Structure::List(list) => Ok(Some(list.clone())),
                _ => Err(mismatch(key)),
            },
            _ => Ok(None),
        }
    }
}
