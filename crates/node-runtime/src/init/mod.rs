//! Startup workflows.

pub mod personal_feed;

pub use personal_feed::{FeedsInitializer, InitError, InitOutcome};
