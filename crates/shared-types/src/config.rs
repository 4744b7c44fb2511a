//! # Feeds Configuration
//!
//! Recognized options with their defaults. Every option can be
//! overridden from the environment with the `MURMUR_` prefix, e.g.
//! `MURMUR_REJOIN_COOLDOWN_BLOCKS=50`.

use crate::entities::BlockIndex;
use std::time::Duration;

/// Configuration for the feeds subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedsConfig {
    /// Caps message pagination on read paths.
    pub max_messages_per_response: usize,

    /// Minimum blocks between leaving a group and rejoining it.
    pub rejoin_cooldown_blocks: BlockIndex,

    /// Blocks after a rotation during which the previous key generation
    /// is still accepted for incoming messages.
    pub keygen_grace_period_blocks: BlockIndex,

    /// Upper bound on entitled members per key rotation.
    pub max_members_per_rotation: usize,

    /// Maximum group title length in UTF-8 code points.
    pub max_title_length: usize,

    /// Age after which orphaned attachment blobs are collected.
    pub orphan_attachment_cleanup_max_age: Duration,

    /// Bound on identity directory lookups during key rotation.
    pub identity_lookup_timeout: Duration,

    /// Tenant-scoped prefix shared by all derived-view cache keys.
    pub cache_key_prefix: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            max_messages_per_response: 100,
            rejoin_cooldown_blocks: 100,
            keygen_grace_period_blocks: 5,
            max_members_per_rotation: 512,
            max_title_length: 100,
            orphan_attachment_cleanup_max_age: Duration::from_secs(10 * 60),
            identity_lookup_timeout: Duration::from_secs(5),
            cache_key_prefix: "murmur".to_string(),
        }
    }
}

impl FeedsConfig {
    /// Build a configuration from the environment, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_messages_per_response: env_usize(
                "MURMUR_MAX_MESSAGES_PER_RESPONSE",
                defaults.max_messages_per_response,
            ),
            rejoin_cooldown_blocks: env_u64(
                "MURMUR_REJOIN_COOLDOWN_BLOCKS",
                defaults.rejoin_cooldown_blocks,
            ),
            keygen_grace_period_blocks: env_u64(
                "MURMUR_KEYGEN_GRACE_PERIOD_BLOCKS",
                defaults.keygen_grace_period_blocks,
            ),
            max_members_per_rotation: env_usize(
                "MURMUR_MAX_MEMBERS_PER_ROTATION",
                defaults.max_members_per_rotation,
            ),
            max_title_length: env_usize("MURMUR_MAX_TITLE_LENGTH", defaults.max_title_length),
            orphan_attachment_cleanup_max_age: Duration::from_secs(env_u64(
                "MURMUR_ORPHAN_ATTACHMENT_CLEANUP_MAX_AGE_SECS",
                defaults.orphan_attachment_cleanup_max_age.as_secs(),
            )),
            identity_lookup_timeout: Duration::from_secs(env_u64(
                "MURMUR_IDENTITY_LOOKUP_TIMEOUT_SECS",
                defaults.identity_lookup_timeout.as_secs(),
            )),
            cache_key_prefix: std::env::var("MURMUR_CACHE_KEY_PREFIX")
                .unwrap_or(defaults.cache_key_prefix),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FeedsConfig::default();
        assert_eq!(config.max_messages_per_response, 100);
        assert_eq!(config.rejoin_cooldown_blocks, 100);
        assert_eq!(config.keygen_grace_period_blocks, 5);
        assert_eq!(config.max_members_per_rotation, 512);
        assert_eq!(config.max_title_length, 100);
        assert_eq!(
            config.orphan_attachment_cleanup_max_age,
            Duration::from_secs(600)
        );
        assert_eq!(config.cache_key_prefix, "murmur");
    }

    #[test]
    fn test_env_fallback_on_garbage() {
        // Unset / garbage values fall back rather than panic.
        std::env::set_var("MURMUR_MAX_TITLE_LENGTH", "not-a-number");
        let config = FeedsConfig::from_env();
        assert_eq!(config.max_title_length, 100);
        std::env::remove_var("MURMUR_MAX_TITLE_LENGTH");
    }
}
