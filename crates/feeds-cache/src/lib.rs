//! # Feeds Cache - Derived-View Caches
//!
//! The seven derived read views and their caching contracts:
//!
//! | Cache | Write path | Read path | TTL |
//! |-------|-----------|-----------|-----|
//! | User feed list | in-place add/remove | cache-aside | minutes |
//! | Feed participants | sync add/remove, invalidate on rotation | cache-aside | session |
//! | Recent messages | write-through, best effort | cache-aside | session |
//! | Key generations | invalidated on rotation | cache-aside | session |
//! | Feed metadata | write on create, cascades | cache-aside | none |
//! | Display names | write on identity update | cache-aside | none |
//! | Read watermarks | write-through, max-wins | cache-aside | ~30 days |
//!
//! ## Graceful degradation
//!
//! Cache write failures log and continue; read failures fall back to
//! the store and repopulate opportunistically. No handler or request
//! outcome depends on cache success.

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod ttl;
pub mod views;

pub use adapters::{FailingCacheBackend, InMemoryCacheBackend};
pub use domain::{
    FeedCaches, FeedMetadataEntry, KeyGenerationDocument, KeyGenerationView, MemberKeyView,
};
pub use errors::{CacheError, CacheResult};
pub use ports::CacheBackend;
pub use ttl::CacheTtl;
pub use views::{FeedViews, ViewError};
