//! # Node Runtime Library
//!
//! Exposes the container and startup workflows for the binary and the
//! unified test suite. The entry point is `main.rs`.

pub mod container;
pub mod init;

pub use container::{FeedsNode, RuntimeConfig};
pub use init::{FeedsInitializer, InitError, InitOutcome};
