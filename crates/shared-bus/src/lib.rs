//! # Shared Bus - Event Bus for Feed Events
//!
//! Fire-and-forget event distribution between the indexing worker and
//! request-path subscribers (push notification fan-out, live gRPC
//! streams, metrics).
//!
//! ## Contract
//!
//! - Publishers never await subscribers.
//! - Delivery is best-effort: subscribers must tolerate duplicates and
//!   gaps, and a lagged subscriber silently skips overwritten events.
//! - No handler outcome ever depends on an event being delivered.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, FeedEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before older events are
/// overwritten.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
