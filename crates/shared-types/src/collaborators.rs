//! # Collaborator Ports
//!
//! Traits for the external systems the feeds core consumes: the chain
//! clock, the node's credentials, the identity directory, and the
//! mempool. The core only ever sees these interfaces; gRPC plumbing,
//! block production and the directory service live outside.
//!
//! In-memory implementations live next to the traits so the runtime can
//! run self-contained and tests can inject deterministic collaborators.

use crate::entities::{BlockIndex, PublicAddress};
use crate::errors::{IdentityError, MempoolError};
use crate::transactions::ValidatedTransaction;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Source of the chain's current block index.
///
/// Injected rather than read from process-wide state so handlers and
/// validators stay deterministic under test.
pub trait BlockchainClock: Send + Sync {
    /// Index of the most recently produced block.
    fn last_block_index(&self) -> BlockIndex;
}

/// The local operator's key material.
#[derive(Debug, Clone)]
pub struct NodeCredentials {
    /// The operator's signing address.
    pub public_signing_address: PublicAddress,
    /// Ed25519 signing seed (32 bytes).
    pub private_signing_key: [u8; 32],
    /// The operator's public encryption address (hex SEC1 point).
    pub public_encrypt_address: String,
}

/// Provider of the node's credentials.
pub trait CredentialsProvider: Send + Sync {
    /// The operator's current credentials.
    fn get(&self) -> NodeCredentials;
}

/// A directory profile for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Public encryption address (hex SEC1 point), used for ECIES wraps.
    pub public_encrypt_address: String,
    /// Human-readable display name.
    pub alias: String,
}

/// Lookup service mapping identity addresses to profiles.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolve the profile registered for `address`.
    async fn lookup(&self, address: &PublicAddress) -> Result<Profile, IdentityError>;
}

/// Submission port into the mempool for transactions that already carry
/// a validator signature.
#[async_trait]
pub trait Mempool: Send + Sync {
    /// Queue a validated transaction for block inclusion.
    async fn submit_verified(&self, tx: ValidatedTransaction) -> Result<(), MempoolError>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATIONS
// =============================================================================

/// Clock backed by an atomic counter, advanced by whoever drives blocks.
#[derive(Debug, Default)]
pub struct FixedClock {
    index: AtomicU64,
}

impl FixedClock {
    /// Create a clock starting at `index`.
    #[must_use]
    pub fn new(index: BlockIndex) -> Self {
        Self {
            index: AtomicU64::new(index),
        }
    }

    /// Move the clock to `index`.
    pub fn set(&self, index: BlockIndex) {
        self.index.store(index, Ordering::SeqCst);
    }
}

impl BlockchainClock for FixedClock {
    fn last_block_index(&self) -> BlockIndex {
        self.index.load(Ordering::SeqCst)
    }
}

/// Credentials provider returning a fixed set of keys.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: NodeCredentials,
}

impl StaticCredentials {
    /// Wrap a fixed credential set.
    #[must_use]
    pub fn new(credentials: NodeCredentials) -> Self {
        Self { credentials }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn get(&self) -> NodeCredentials {
        self.credentials.clone()
    }
}

/// Directory backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    profiles: RwLock<HashMap<PublicAddress, Profile>>,
}

impl InMemoryIdentityDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile.
    pub fn register(&self, address: impl Into<PublicAddress>, profile: Profile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(address.into(), profile);
        }
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn lookup(&self, address: &PublicAddress) -> Result<Profile, IdentityError> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| IdentityError::Unavailable("directory lock poisoned".to_string()))?;
        profiles
            .get(address)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(address.clone()))
    }
}

/// Mempool that records submissions for later draining.
#[derive(Debug, Default)]
pub struct InMemoryMempool {
    queued: RwLock<Vec<ValidatedTransaction>>,
}

impl InMemoryMempool {
    /// Create an empty mempool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything queued so far, in submission order.
    pub fn drain(&self) -> Vec<ValidatedTransaction> {
        self.queued
            .write()
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of queued transactions.
    pub fn len(&self) -> usize {
        self.queued.read().map(|q| q.len()).unwrap_or(0)
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Mempool for InMemoryMempool {
    async fn submit_verified(&self, tx: ValidatedTransaction) -> Result<(), MempoolError> {
        let mut queued = self
            .queued
            .write()
            .map_err(|_| MempoolError::Unavailable("mempool lock poisoned".to_string()))?;
        queued.push(tx);
        Ok(())
    }
}
