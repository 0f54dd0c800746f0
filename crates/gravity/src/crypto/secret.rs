//! Symmetric encryption using ChaCha20-Poly1305
//!
//! Every private record in the profile tree is encrypted under some
//! [`Secret`]: the master key, a pairwise secret, or a group key. The wire
//! format is always `nonce (12 bytes) || ciphertext || tag (16 bytes)`,
//! with a fresh random nonce per encryption.

use std::ops::Deref;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use serde::{Deserialize, Serialize};

use super::codec;

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;
/// Size of a symmetric key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;

/// Errors that can occur during symmetric encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// The blob cannot even hold a nonce and a tag.
    #[error("message too short: {len} bytes, need at least {min}")]
    ShortMessage { len: usize, min: usize },
    /// The authentication tag did not verify: wrong key or tampered data.
    #[error("authentication failed")]
    AuthFailed,
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A 256-bit symmetric encryption key
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate();
/// let blob = secret.encrypt(b"private record")?;
/// let plain = secret.decrypt(&blob)?;
/// assert_eq!(plain, b"private record");
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Secret([u8; SECRET_SIZE]);

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Parse a secret from its url-safe base64 representation
    pub fn from_b64url(text: &str) -> Result<Self, SecretError> {
        let bytes = codec::b64url_decode(text)
            .map_err(|e| anyhow::anyhow!("secret is not valid base64url: {}", e))?;
        Self::from_slice(&bytes)
    }

    /// Encode the raw key bytes as url-safe base64
    pub fn to_b64url(&self) -> String {
        codec::b64url_encode(&self.0)
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Encrypt data, returning `nonce || ciphertext || tag`
    ///
    /// A random nonce is drawn for every call; nonces are never reused.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let key = Key::from_slice(self.bytes());
        let cipher = ChaCha20Poly1305::new(key);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext || tag` blob
    ///
    /// # Errors
    ///
    /// - [`SecretError::ShortMessage`] when the blob cannot hold a nonce
    ///   and a tag
    /// - [`SecretError::AuthFailed`] when the tag does not verify (wrong
    ///   key or tampered data)
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SecretError::ShortMessage {
                len: data.len(),
                min: NONCE_SIZE + TAG_SIZE,
            });
        }

        let key = Key::from_slice(self.bytes());
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new(key);
        let plaintext = cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| SecretError::AuthFailed)?;

        Ok(plaintext)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let secret = Secret::generate();
        let data = b"hello world, this is a test message for encryption";

        let encrypted = secret.encrypt(data).unwrap();
        let decrypted = secret.decrypt(&encrypted).unwrap();

        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_wrong_key_fails_auth() {
        let secret = Secret::generate();
        let other = Secret::generate();
        let encrypted = secret.encrypt(b"sealed under the first key").unwrap();

        let result = other.decrypt(&encrypted);
        assert!(matches!(result, Err(SecretError::AuthFailed)));
    }

    #[test]
    fn test_short_message() {
        let secret = Secret::generate();

        // One byte short of nonce + tag
        let blob = vec![0u8; NONCE_SIZE + TAG_SIZE - 1];
        let result = secret.decrypt(&blob);
        assert!(matches!(result, Err(SecretError::ShortMessage { .. })));

        // Shorter than a nonce alone
        let blob = vec![0u8; NONCE_SIZE - 1];
        let result = secret.decrypt(&blob);
        assert!(matches!(result, Err(SecretError::ShortMessage { .. })));
    }

    #[test]
    fn test_tampered_ciphertext_fails_auth() {
        let secret = Secret::generate();
        let mut encrypted = secret.encrypt(b"integrity protected").unwrap();
        encrypted[NONCE_SIZE + 2] ^= 0xFF;

        let result = secret.decrypt(&encrypted);
        assert!(matches!(result, Err(SecretError::AuthFailed)));
    }

    #[test]
    fn test_empty_data_encryption() {
        let secret = Secret::generate();

        let encrypted = secret.encrypt(b"").unwrap();
        let decrypted = secret.decrypt(&encrypted).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_size_validation() {
        assert!(Secret::from_slice(&[1u8; 16]).is_err());
        assert!(Secret::from_slice(&[1u8; 64]).is_err());
        assert!(Secret::from_slice(&[1u8; SECRET_SIZE]).is_ok());
    }

    #[test]
    fn test_b64url_roundtrip() {
        let secret = Secret::generate();
        let text = secret.to_b64url();
        assert!(!text.contains('='));
        let recovered = Secret::from_b64url(&text).unwrap();
        assert_eq!(secret, recovered);
    }
}
