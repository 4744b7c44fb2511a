//! # Feeds Keyring - Group Key Rotation Engine
//!
//! Drives group encryption epochs: `0 → 1 → 2 …`, one transition per
//! triggering event (creation, join, add, leave, ban, unban, or an
//! explicit rotation). Block, unblock, promote, metadata updates and
//! plain messages never rotate.
//!
//! ## Guarantees
//!
//! - A new epoch wraps the fresh key for every entitled member (Admin,
//!   Member, Blocked) and for nobody else; banned members are excluded
//!   structurally, which is what denies an unbanned member the ban-era
//!   history.
//! - Persistence is atomic with the group's `current_key_generation`
//!   pointer; a failed rotation leaves the previous generation intact.
//! - The plaintext epoch key exists only on the engine's stack frame and
//!   is zeroized on drop.

pub mod engine;
pub mod errors;

pub use engine::{JoiningMember, RotationEngine, RotationOutcome};
pub use errors::RotationError;
