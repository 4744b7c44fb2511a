//! # Feeds Validation
//!
//! The mempool-submission half of the transaction pipeline: raw bytes
//! are parsed by the codec registry, then content-validated per kind.
//!
//! ## Contract
//!
//! - Parsing fails with `MalformedPayload` on structural mismatch; the
//!   registry is immutable after startup.
//! - Validators enforce signatory and domain rules; the outcome is a
//!   two-variant result (`Rejected | Validated`), never a partially
//!   applied transaction.
//! - Validators run on the (possibly concurrent) submission path and
//!   perform read-only store queries; handlers re-trust only the
//!   attached validator signature once a transaction is in a block.

pub mod codec;
pub mod context;
pub mod predicates;
pub mod validators;

pub use codec::{CodecError, CodecRegistry};
pub use context::{ValidationOutcome, ValidatorContext};
pub use validators::{ContentValidator, ValidatorRegistry};
