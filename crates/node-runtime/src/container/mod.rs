//! Container: configuration and subsystem wiring.

pub mod config;
pub mod subsystems;

pub use config::RuntimeConfig;
pub use subsystems::FeedsNode;
