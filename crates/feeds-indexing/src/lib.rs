//! # Feeds Indexing
//!
//! The block half of the transaction pipeline: validated transactions
//! drained from a block are routed, one at a time and in order, to the
//! unique handler for their kind. Handlers mutate the store, the key
//! epochs and the derived-view caches in a prescribed order and emit
//! fire-and-forget events.
//!
//! ## Error discipline
//!
//! Expected conditions (duplicate create, already-member, missing row,
//! stale rotation) are no-ops because the content validator is the sole
//! gate. Only unknown kinds and post-commit invariant violations error,
//! and those halt the indexing worker.

pub mod audit;
pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod handlers;

pub use context::HandlerContext;
pub use dispatcher::BlockIndexer;
pub use errors::IndexingError;
pub use handlers::{HandlerRegistry, TransactionHandler};
