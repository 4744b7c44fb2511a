//! # ECIES Key Wrapping
//!
//! Integrated encryption over secp256k1: an ephemeral ECDH agreement,
//! a SHA-256 KDF over the shared point, and XChaCha20-Poly1305 for the
//! payload. Used to wrap group epoch keys to each entitled member's
//! public encryption key.
//!
//! Wire layout: `ephemeral_pubkey (33, compressed SEC1) || nonce (24) ||
//! ciphertext`.

use crate::symmetric::{self, SecretKey};
use crate::CryptoError;
use k256::ecdh::EphemeralSecret;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

/// Length of a compressed SEC1 secp256k1 point.
const POINT_LEN: usize = 33;

/// A member's public encryption key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptionPublicKey(k256::PublicKey);

impl EncryptionPublicKey {
    /// Parse from SEC1 bytes (compressed or uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Parse from a hex-encoded SEC1 point, the directory's address form.
    pub fn from_hex(hex_point: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_point.trim()).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Hex-encoded compressed SEC1 point.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_encoded_point(true).as_bytes())
    }
}

/// A member's encryption keypair. Only test rigs and the local operator
/// hold one; the node wraps keys with public halves alone.
pub struct EncryptionKeyPair {
    secret: k256::SecretKey,
}

impl EncryptionKeyPair {
    /// Generate a fresh keypair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            secret: k256::SecretKey::random(&mut rand::thread_rng()),
        }
    }

    /// The public half.
    #[must_use]
    pub fn public_key(&self) -> EncryptionPublicKey {
        EncryptionPublicKey(self.secret.public_key())
    }

    /// The public half in the directory's hex address form.
    #[must_use]
    pub fn public_address(&self) -> String {
        self.public_key().to_hex()
    }

    /// Unwrap a payload produced by [`encrypt`] for this keypair.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < POINT_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "{} bytes, need at least {POINT_LEN}",
                sealed.len()
            )));
        }
        let (point, body) = sealed.split_at(POINT_LEN);
        let ephemeral = k256::PublicKey::from_sec1_bytes(point)
            .map_err(|_| CryptoError::MalformedCiphertext("bad ephemeral point".to_string()))?;

        let shared = k256::ecdh::diffie_hellman(
            self.secret.to_nonzero_scalar(),
            ephemeral.as_affine(),
        );
        let key = derive_key(shared.raw_secret_bytes().as_slice(), point);
        symmetric::open(&key, body)
    }
}

impl std::fmt::Debug for EncryptionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKeyPair(..)")
    }
}

/// Wrap `plaintext` to `recipient`.
///
/// A fresh ephemeral keypair is generated per call, so two wraps of the
/// same plaintext never share bytes.
pub fn encrypt(recipient: &EncryptionPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = EphemeralSecret::random(&mut rand::thread_rng());
    let ephemeral_point = ephemeral.public_key().to_encoded_point(true);

    let shared = ephemeral.diffie_hellman(&recipient.0);
    let key = derive_key(shared.raw_secret_bytes().as_slice(), ephemeral_point.as_bytes());

    let body = symmetric::seal(&key, plaintext)?;

    let mut out = Vec::with_capacity(POINT_LEN + body.len());
    out.extend_from_slice(ephemeral_point.as_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// KDF: SHA-256 over the raw shared secret and the ephemeral point,
/// binding the derived key to this particular agreement.
fn derive_key(shared_secret: &[u8], ephemeral_point: &[u8]) -> SecretKey {
    let mut hasher = Sha256::new();
    hasher.update(shared_secret);
    hasher.update(ephemeral_point);
    let digest: [u8; 32] = hasher.finalize().into();
    SecretKey::from_bytes(digest)
}
