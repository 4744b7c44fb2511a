//! # Codec Registry
//!
//! Maps each 128-bit transaction kind tag to a pair of parsers: one for
//! signed transactions and one for validated ones. The two wire shapes
//! are identical apart from the validator signature slot.
//!
//! The registry is built once at startup and never mutated afterwards.

use serde_json::Value;
use shared_types::transactions::{
    RawTransaction, SignedTransaction, TransactionKind, TransactionPayload, ValidatedTransaction,
};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Codec failures, surfaced to the submitter by the mempool.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The document is not a transaction at all.
    #[error("malformed transaction document: {0}")]
    MalformedDocument(String),

    /// The kind tag is not registered.
    #[error("unknown transaction kind tag {0}")]
    UnknownKind(Uuid),

    /// The payload does not match the kind's schema.
    #[error("malformed payload for {kind}: {reason}")]
    MalformedPayload {
        /// Kind the payload was parsed as.
        kind: TransactionKind,
        /// Parser diagnostic.
        reason: String,
    },

    /// A validated parse was requested but no validator signature is
    /// present.
    #[error("missing validator signature on {0} transaction")]
    MissingValidatorSignature(TransactionKind),
}

/// Parser pair for one transaction kind.
struct KindCodec {
    kind: TransactionKind,
}

impl KindCodec {
    fn parse_payload(&self, value: Value) -> Result<TransactionPayload, CodecError> {
        TransactionPayload::from_wire_value(self.kind, value).map_err(|e| {
            CodecError::MalformedPayload {
                kind: self.kind,
                reason: e.to_string(),
            }
        })
    }

    fn parse_signed(&self, raw: RawTransaction) -> Result<SignedTransaction, CodecError> {
        Ok(SignedTransaction {
            payload: self.parse_payload(raw.payload)?,
            user_signature: raw.user_signature,
        })
    }

    fn parse_validated(&self, raw: RawTransaction) -> Result<ValidatedTransaction, CodecError> {
        let validator_signature = raw
            .validator_signature
            .clone()
            .ok_or(CodecError::MissingValidatorSignature(self.kind))?;
        Ok(ValidatedTransaction {
            payload: self.parse_payload(raw.payload)?,
            user_signature: raw.user_signature,
            validator_signature,
        })
    }
}

/// Immutable kind-tag → parser-pair registry.
pub struct CodecRegistry {
    codecs: HashMap<Uuid, KindCodec>,
}

impl CodecRegistry {
    /// Build the registry over every known kind.
    #[must_use]
    pub fn with_all_kinds() -> Self {
        let codecs = TransactionKind::ALL
            .into_iter()
            .map(|kind| (kind.tag(), KindCodec { kind }))
            .collect();
        Self { codecs }
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// True if no kinds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Parse raw bytes into a signed transaction.
    pub fn parse_signed(&self, bytes: &[u8]) -> Result<SignedTransaction, CodecError> {
        let raw = self.parse_raw(bytes)?;
        self.lookup(raw.kind)?.parse_signed(raw)
    }

    /// Parse raw bytes into a validated transaction.
    pub fn parse_validated(&self, bytes: &[u8]) -> Result<ValidatedTransaction, CodecError> {
        let raw = self.parse_raw(bytes)?;
        self.lookup(raw.kind)?.parse_validated(raw)
    }

    fn parse_raw(&self, bytes: &[u8]) -> Result<RawTransaction, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::MalformedDocument(e.to_string()))
    }

    fn lookup(&self, tag: Uuid) -> Result<&KindCodec, CodecError> {
        self.codecs.get(&tag).ok_or(CodecError::UnknownKind(tag))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_all_kinds()
    }
}
