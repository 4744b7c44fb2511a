//! Time-to-live classes for the derived-view caches.

use std::time::Duration;

/// TTL class of a cache, per the view it backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Short-lived views (user feed lists).
    Minutes,
    /// Session-scoped views (participants, recent messages, key
    /// generations).
    Session,
    /// Views that only change through writes (feed metadata, display
    /// names).
    Persistent,
    /// Read watermarks.
    Days30,
}

impl CacheTtl {
    /// The concrete expiry, `None` for persistent entries.
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Minutes => Some(Duration::from_secs(5 * 60)),
            Self::Session => Some(Duration::from_secs(60 * 60)),
            Self::Persistent => None,
            Self::Days30 => Some(Duration::from_secs(30 * 24 * 60 * 60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(CacheTtl::Minutes.duration(), Some(Duration::from_secs(300)));
        assert_eq!(CacheTtl::Persistent.duration(), None);
        assert_eq!(
            CacheTtl::Days30.duration(),
            Some(Duration::from_secs(2_592_000))
        );
    }
}
