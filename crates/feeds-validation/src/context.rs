//! Shared context for content validators.

use feeds_store::FeedsStore;
use shared_crypto::signatures::Ed25519KeyPair;
use shared_types::collaborators::{BlockchainClock, CredentialsProvider};
use shared_types::config::FeedsConfig;
use shared_types::transactions::{
    validator_signing_bytes, SignedTransaction, TransactionSignature, ValidatedTransaction,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Outcome of content validation. There is no third state: a validator
/// either rejects a transaction outright or returns it carrying the
/// validator's signature, never a partially modified one.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// The transaction violated a content rule and never becomes
    /// validated.
    Rejected,
    /// The transaction passed and now carries the validator signature.
    Validated(ValidatedTransaction),
}

impl ValidationOutcome {
    /// True for the validated variant.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated(_))
    }

    /// Unwrap into the validated transaction, if any.
    #[must_use]
    pub fn into_validated(self) -> Option<ValidatedTransaction> {
        match self {
            Self::Validated(tx) => Some(tx),
            Self::Rejected => None,
        }
    }
}

/// Read-only dependencies shared by every validator.
///
/// Validators run on the (possibly concurrent) mempool submission path;
/// they query the store but never write it.
pub struct ValidatorContext {
    /// Authoritative store, read-only here.
    pub store: Arc<dyn FeedsStore>,
    /// Source of the current block index (cooldowns, grace windows).
    pub clock: Arc<dyn BlockchainClock>,
    /// The node's credentials used to attach the validator signature.
    pub credentials: Arc<dyn CredentialsProvider>,
    /// Recognized limits (cooldown, grace period, title length).
    pub config: FeedsConfig,
}

impl ValidatorContext {
    /// Record a rejection and return the rejected outcome.
    pub fn reject(&self, kind: &str, reason: &str) -> ValidationOutcome {
        murmur_telemetry::VALIDATIONS_REJECTED.inc();
        debug!(kind, reason, "transaction rejected");
        ValidationOutcome::Rejected
    }

    /// Attach the validator signature to a transaction that passed every
    /// content rule.
    pub fn attach_signature(&self, tx: SignedTransaction) -> ValidationOutcome {
        let kind = tx.kind();
        let payload_value = match tx.payload.to_wire_value() {
            Ok(value) => value,
            Err(e) => {
                error!(%kind, error = %e, "payload serialization failed while signing");
                return ValidationOutcome::Rejected;
            }
        };
        let bytes = match validator_signing_bytes(kind, &payload_value, &tx.user_signature) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(%kind, error = %e, "signing bytes serialization failed");
                return ValidationOutcome::Rejected;
            }
        };

        let credentials = self.credentials.get();
        let keypair = Ed25519KeyPair::from_seed(credentials.private_signing_key);
        let signature = keypair.sign(&bytes);

        ValidationOutcome::Validated(ValidatedTransaction {
            payload: tx.payload,
            user_signature: tx.user_signature,
            validator_signature: TransactionSignature {
                signatory: credentials.public_signing_address,
                signature,
            },
        })
    }
}
