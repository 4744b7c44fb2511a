//! Runtime configuration.

use shared_crypto::ecies::EncryptionKeyPair;
use shared_crypto::signatures::Ed25519KeyPair;
use shared_types::collaborators::NodeCredentials;
use shared_types::config::FeedsConfig;

/// Everything the node needs to start: the feeds limits and the
/// operator's key material.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Feeds subsystem limits.
    pub feeds: FeedsConfig,
    /// Operator credentials.
    pub credentials: NodeCredentials,
}

impl RuntimeConfig {
    /// Build from the environment.
    ///
    /// `MURMUR_OPERATOR_SEED` (hex, 32 bytes) pins the operator's
    /// signing key; without it a fresh keypair is generated, which is
    /// fine for development nodes.
    #[must_use]
    pub fn from_env() -> Self {
        let seed = std::env::var("MURMUR_OPERATOR_SEED")
            .ok()
            .and_then(|raw| hex::decode(raw.trim()).ok())
            .and_then(|bytes| <[u8; 32]>::try_from(bytes.as_slice()).ok());

        Self {
            feeds: FeedsConfig::from_env(),
            credentials: Self::credentials_from_seed(seed),
        }
    }

    /// Derive a credential set from a seed, or generate one.
    #[must_use]
    pub fn credentials_from_seed(seed: Option<[u8; 32]>) -> NodeCredentials {
        let signing = match seed {
            Some(seed) => Ed25519KeyPair::from_seed(seed),
            None => Ed25519KeyPair::generate(),
        };
        // The encryption keypair is derived fresh per process; the
        // directory entry is what peers resolve.
        let encryption = EncryptionKeyPair::generate();

        NodeCredentials {
            public_signing_address: hex::encode(signing.public_key().as_bytes()),
            private_signing_key: signing.to_seed(),
            public_encrypt_address: encryption.public_address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_fixed_seed_are_stable() {
        let a = RuntimeConfig::credentials_from_seed(Some([7u8; 32]));
        let b = RuntimeConfig::credentials_from_seed(Some([7u8; 32]));
        assert_eq!(a.public_signing_address, b.public_signing_address);
        assert_eq!(a.private_signing_key, b.private_signing_key);
    }

    #[test]
    fn test_generated_credentials_differ() {
        let a = RuntimeConfig::credentials_from_seed(None);
        let b = RuntimeConfig::credentials_from_seed(None);
        assert_ne!(a.public_signing_address, b.public_signing_address);
    }
}
