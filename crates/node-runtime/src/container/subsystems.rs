//! Subsystem wiring.
//!
//! One place where every feeds component is constructed and connected:
//! store, caches, views, rotation engine, codec, validators, handlers,
//! dispatcher and the startup workflow.

use crate::container::config::RuntimeConfig;
use crate::init::FeedsInitializer;
use feeds_cache::{FeedCaches, FeedViews, InMemoryCacheBackend};
use feeds_indexing::{BlockIndexer, HandlerContext};
use feeds_keyring::RotationEngine;
use feeds_store::MemoryFeedsStore;
use feeds_validation::{CodecRegistry, ValidatorContext, ValidatorRegistry};
use shared_bus::InMemoryEventBus;
use shared_types::collaborators::{
    FixedClock, InMemoryIdentityDirectory, InMemoryMempool, StaticCredentials,
};
use std::sync::Arc;
use tracing::info;

/// The fully wired feeds node.
///
/// Collaborators that are external in production (clock, identity
/// directory, mempool) are the in-process implementations here; the
/// gRPC surface and block producer drive them from outside.
pub struct FeedsNode {
    /// Chain clock, advanced by whoever applies blocks.
    pub clock: Arc<FixedClock>,
    /// Identity directory.
    pub identity: Arc<InMemoryIdentityDirectory>,
    /// Mempool collecting validated transactions.
    pub mempool: Arc<InMemoryMempool>,
    /// Operator credentials.
    pub credentials: Arc<StaticCredentials>,
    /// Authoritative store.
    pub store: Arc<MemoryFeedsStore>,
    /// Event bus.
    pub bus: Arc<InMemoryEventBus>,
    /// Derived-view caches.
    pub caches: Arc<FeedCaches>,
    /// Cache-aside read service.
    pub views: Arc<FeedViews>,
    /// Rotation engine.
    pub keyring: Arc<RotationEngine>,
    /// Wire codec registry.
    pub codec: Arc<CodecRegistry>,
    /// Content validator registry.
    pub validators: Arc<ValidatorRegistry>,
    /// Block dispatcher.
    pub indexer: Arc<BlockIndexer>,
    /// Startup workflow.
    pub initializer: FeedsInitializer,
}

impl FeedsNode {
    /// Construct and wire every subsystem.
    #[must_use]
    pub fn build(config: RuntimeConfig) -> Self {
        let clock = Arc::new(FixedClock::new(0));
        let identity = Arc::new(InMemoryIdentityDirectory::new());
        let mempool = Arc::new(InMemoryMempool::new());
        let credentials = Arc::new(StaticCredentials::new(config.credentials.clone()));
        let store = Arc::new(MemoryFeedsStore::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let backend = Arc::new(InMemoryCacheBackend::new());
        let caches = Arc::new(FeedCaches::new(backend, &config.feeds));
        let views = Arc::new(FeedViews::new(
            caches.clone(),
            store.clone(),
            identity.clone(),
            config.feeds.clone(),
        ));
        let keyring = Arc::new(RotationEngine::new(
            store.clone(),
            identity.clone(),
            config.feeds.clone(),
        ));

        let codec = Arc::new(CodecRegistry::with_all_kinds());
        let validators = Arc::new(ValidatorRegistry::with_defaults(Arc::new(
            ValidatorContext {
                store: store.clone(),
                clock: clock.clone(),
                credentials: credentials.clone(),
                config: config.feeds.clone(),
            },
        )));

        let handler_ctx = Arc::new(HandlerContext {
            store: store.clone(),
            keyring: keyring.clone(),
            caches: caches.clone(),
            views: views.clone(),
            bus: bus.clone(),
            config: config.feeds.clone(),
        });
        let indexer = Arc::new(BlockIndexer::new(handler_ctx));

        let initializer = FeedsInitializer::new(
            store.clone(),
            credentials.clone(),
            mempool.clone(),
            validators.clone(),
            bus.clone(),
        );

        info!(
            operator = %config.credentials.public_signing_address,
            "feeds node wired"
        );

        Self {
            clock,
            identity,
            mempool,
            credentials,
            store,
            bus,
            caches,
            views,
            keyring,
            codec,
            validators,
            indexer,
            initializer,
        }
    }
}
