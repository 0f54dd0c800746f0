//! Asymmetric sealing using RSA-OAEP hybrid encryption
//!
//! Subscriber drops are sealed toward a peer who is known only by their
//! long-term RSA public key. RSA-OAEP alone cannot carry the drop
//! plaintext (the canonical PEM inside it exceeds one RSA block), so a
//! fresh content key is wrapped with RSA-OAEP(SHA-256) and the payload is
//! AEAD-encrypted under it.
//!
//! # Wire Format
//!
//! ```text
//! [ wrapped_len: u16 be ][ rsa_oaep(content_key) ][ nonce || ciphertext || tag ]
//! ```
//!
//! Opening a blob with the wrong private key fails the OAEP unwrap, which
//! surfaces as [`AsymError::AuthFailed`]; there is no path to a false
//! plaintext. Trial decryption relies on exactly this property.

use rand::rngs::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use super::secret::{Secret, SecretError, NONCE_SIZE, TAG_SIZE};

/// Errors that can occur during asymmetric sealing
#[derive(Debug, thiserror::Error)]
pub enum AsymError {
    /// The blob cannot hold a wrapped key and a symmetric envelope.
    #[error("sealed message too short: {len} bytes")]
    ShortMessage { len: usize },
    /// The key unwrap or the payload tag failed: wrong key or tampered data.
    #[error("authentication failed")]
    AuthFailed,
    #[error("seal error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Seal a plaintext toward the holder of `recipient`'s private key
pub fn encrypt(recipient: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, AsymError> {
    let content_key = Secret::generate();

    let wrapped = recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), content_key.bytes())
        .map_err(|e| anyhow::anyhow!("RSA-OAEP wrap error: {}", e))?;

    let envelope = content_key
        .encrypt(plaintext)
        .map_err(|e| anyhow::anyhow!("payload encrypt error: {}", e))?;

    let mut out = Vec::with_capacity(2 + wrapped.len() + envelope.len());
    out.extend_from_slice(&(wrapped.len() as u16).to_be_bytes());
    out.extend_from_slice(&wrapped);
    out.extend_from_slice(&envelope);

    Ok(out)
}

/// Open a sealed blob with this node's private key
///
/// # Errors
///
/// - [`AsymError::ShortMessage`] when the blob is structurally truncated
/// - [`AsymError::AuthFailed`] when the blob was sealed for a different
///   key, or was tampered with
pub fn decrypt(private: &RsaPrivateKey, blob: &[u8]) -> Result<Vec<u8>, AsymError> {
    if blob.len() < 2 {
        return Err(AsymError::ShortMessage { len: blob.len() });
    }
    let wrapped_len = u16::from_be_bytes([blob[0], blob[1]]) as usize;
    if blob.len() < 2 + wrapped_len + NONCE_SIZE + TAG_SIZE {
        return Err(AsymError::ShortMessage { len: blob.len() });
    }

    let key_bytes = private
        .decrypt(Oaep::new::<Sha256>(), &blob[2..2 + wrapped_len])
        .map_err(|_| AsymError::AuthFailed)?;
    let content_key = Secret::from_slice(&key_bytes).map_err(|_| AsymError::AuthFailed)?;

    content_key
        .decrypt(&blob[2 + wrapped_len..])
        .map_err(|e| match e {
            SecretError::AuthFailed => AsymError::AuthFailed,
            SecretError::ShortMessage { len, .. } => AsymError::ShortMessage { len },
            SecretError::Default(e) => AsymError::Default(e),
        })
}
