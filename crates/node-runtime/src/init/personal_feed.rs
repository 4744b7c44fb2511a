//! # Feeds Initialization Workflow
//!
//! On startup the node ensures its operator owns a personal feed. If
//! none exists, it synthesizes the creation transaction (fresh feed
//! key, ECIES-wrapped to the operator's own encryption address, signed
//! with the operator's signing key), validates it locally and submits
//! it to the mempool. Either way, a single "feeds initialized" event is
//! emitted per process.

use feeds_store::{FeedsStore, StoreError};
use feeds_validation::{ValidationOutcome, ValidatorRegistry};
use shared_bus::{EventPublisher, FeedEvent};
use shared_crypto::ecies::{self, EncryptionPublicKey};
use shared_crypto::signatures::Ed25519KeyPair;
use shared_crypto::symmetric::SecretKey;
use shared_crypto::CryptoError;
use shared_types::collaborators::{CredentialsProvider, Mempool};
use shared_types::entities::FeedId;
use shared_types::errors::MempoolError;
use shared_types::transactions::{
    user_signing_bytes, NewPersonalFeedPayload, SignedTransaction, TransactionPayload,
    TransactionSignature,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Startup workflow failures.
#[derive(Debug, Error)]
pub enum InitError {
    /// The store could not answer the existence check.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Wrapping the feed key for the operator failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The transaction payload could not be serialized for signing.
    #[error("signing bytes serialization failed: {0}")]
    Signing(#[from] serde_json::Error),

    /// The node's own validator rejected the bootstrap transaction.
    #[error("bootstrap transaction rejected by content validation")]
    Rejected,

    /// The mempool refused the bootstrap transaction.
    #[error(transparent)]
    Mempool(#[from] MempoolError),
}

/// What the workflow found or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The operator already owns a personal feed.
    AlreadyPresent(FeedId),
    /// A creation transaction was submitted to the mempool.
    Submitted(FeedId),
}

/// The startup workflow.
pub struct FeedsInitializer {
    store: Arc<dyn FeedsStore>,
    credentials: Arc<dyn CredentialsProvider>,
    mempool: Arc<dyn Mempool>,
    validators: Arc<ValidatorRegistry>,
    bus: Arc<dyn EventPublisher>,
    emitted: AtomicBool,
}

impl FeedsInitializer {
    /// Wire up the workflow.
    pub fn new(
        store: Arc<dyn FeedsStore>,
        credentials: Arc<dyn CredentialsProvider>,
        mempool: Arc<dyn Mempool>,
        validators: Arc<ValidatorRegistry>,
        bus: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            credentials,
            mempool,
            validators,
            bus,
            emitted: AtomicBool::new(false),
        }
    }

    /// Ensure the operator has a personal feed, submitting the creation
    /// transaction when needed, and emit the initialization event once.
    pub async fn ensure_personal_feed(&self) -> Result<InitOutcome, InitError> {
        let credentials = self.credentials.get();
        let operator = credentials.public_signing_address.clone();

        if let Some(feed) = self.store.get_personal_feed_of(&operator).await? {
            info!(operator = %operator, feed = %feed.feed_id, "personal feed already present");
            self.emit_initialized(&operator).await;
            return Ok(InitOutcome::AlreadyPresent(feed.feed_id));
        }

        // Fresh feed key, wrapped to ourselves. The plaintext key is
        // dropped (and zeroized) before this function returns.
        let feed_key = SecretKey::generate();
        let recipient = EncryptionPublicKey::from_hex(&credentials.public_encrypt_address)?;
        let encrypted_feed_key = ecies::encrypt(&recipient, feed_key.as_bytes())?;

        let feed_id = FeedId::generate();
        let payload = TransactionPayload::NewPersonalFeed(NewPersonalFeedPayload {
            feed_id,
            encrypted_feed_key,
        });

        let payload_value = payload.to_wire_value()?;
        let bytes = user_signing_bytes(payload.kind(), &payload_value)?;
        let keypair = Ed25519KeyPair::from_seed(credentials.private_signing_key);
        let signed = SignedTransaction {
            payload,
            user_signature: TransactionSignature {
                signatory: operator.clone(),
                signature: keypair.sign(&bytes),
            },
        };

        let validated = match self.validators.validate(signed).await {
            ValidationOutcome::Validated(tx) => tx,
            ValidationOutcome::Rejected => return Err(InitError::Rejected),
        };
        self.mempool.submit_verified(validated).await?;

        info!(operator = %operator, feed = %feed_id, "personal feed bootstrap submitted");
        self.emit_initialized(&operator).await;
        Ok(InitOutcome::Submitted(feed_id))
    }

    /// At most one initialization event per process.
    async fn emit_initialized(&self, operator: &str) {
        if self
            .emitted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.bus
                .publish(FeedEvent::FeedsInitialized {
                    operator: operator.to_string(),
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::container::{FeedsNode, RuntimeConfig};
    use shared_bus::{EventFilter, FeedEvent};
    use shared_types::collaborators::CredentialsProvider;
    use shared_types::config::FeedsConfig;
    use shared_types::transactions::TransactionKind;

    fn node() -> FeedsNode {
        FeedsNode::build(RuntimeConfig {
            feeds: FeedsConfig::default(),
            credentials: RuntimeConfig::credentials_from_seed(Some([9u8; 32])),
        })
    }

    #[tokio::test]
    async fn test_bootstrap_submits_to_mempool() {
        let node = node();
        let outcome = node.initializer.ensure_personal_feed().await.unwrap();
        assert!(matches!(
            outcome,
            super::InitOutcome::Submitted(_)
        ));

        let queued = node.mempool.drain();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind(), TransactionKind::NewPersonalFeed);
        // Self-validated: the validator signature is the operator's own.
        assert_eq!(
            queued[0].validator_signature.signatory,
            node.credentials.get().public_signing_address
        );
    }

    #[tokio::test]
    async fn test_initialized_event_fires_once() {
        let node = node();
        let mut events = node.bus.subscribe(EventFilter::all());

        node.initializer.ensure_personal_feed().await.unwrap();
        node.initializer.ensure_personal_feed().await.unwrap();

        assert!(matches!(
            events.try_recv().unwrap(),
            Some(FeedEvent::FeedsInitialized { .. })
        ));
        // The second run submitted again but did not re-emit.
        assert!(events.try_recv().unwrap().is_none());
    }
}
