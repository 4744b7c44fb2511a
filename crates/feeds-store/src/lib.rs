//! # Feeds Store
//!
//! Authoritative persistence for feeds, participants, group metadata,
//! messages, key generations and per-member encrypted key rows.
//!
//! ## Invariants Enforced
//!
//! - A creator owns at most one personal feed (conditional insert).
//! - A group's `current_key_generation` always equals the highest
//!   persisted generation; epochs only ever advance by exactly one.
//! - At most one key generation per group is open
//!   (`valid_to_block == None`), and it is the current one.
//! - One participant row per (feed, address): at most one active row.
//! - Read positions are max-wins.
//!
//! ## Module Structure
//!
//! - `ports` - the `FeedsStore` trait consumed by validators, handlers,
//!   the rotation engine and the view services
//! - `adapters` - the in-memory authoritative implementation

pub mod adapters;
pub mod errors;
pub mod ports;

pub use adapters::MemoryFeedsStore;
pub use errors::StoreError;
pub use ports::FeedsStore;
