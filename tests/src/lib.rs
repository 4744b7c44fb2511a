//! # Murmur Test Suite
//!
//! Unified test crate for the feeds pipeline:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs     # Wired node + user fixtures
//!     ├── scenarios.rs   # End-to-end feed lifecycles
//!     └── boundaries.rs  # Cooldown, grace window, rotation caps
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p murmur-tests
//! cargo test -p murmur-tests integration::scenarios::
//! ```

pub mod integration;
