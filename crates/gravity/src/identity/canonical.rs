//! Canonical public-key normalization
//!
//! A peer's key may be presented as the canonical PKCS#8 PEM or as the
//! identity subsystem's protobuf frame. Normalization runs the input
//! through a pipeline of format recognizers; the first recognizer that
//! accepts the input yields an RSA public key which is re-exported as
//! canonical PEM. Re-export also canonicalizes whitespace, which makes
//! normalization idempotent on already-canonical input.

use std::fmt;

use prost::Message;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::crypto::hash::multihash_b58;

use super::proto::{KeyFrame, KEY_TYPE_RSA};

/// Errors that can occur during key normalization
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// No recognizer accepted the input.
    #[error("unrecognized public key encoding")]
    Unrecognized,
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A recognizer is a total check of one accepted input format.
///
/// It returns `None` when the input is not in its format, and the parsed
/// key otherwise. The pipeline below tries recognizers in order and
/// surfaces [`KeyError::Unrecognized`] only after exhausting the list.
type Recognizer = fn(&[u8]) -> Option<RsaPublicKey>;

const RECOGNIZERS: &[(&str, Recognizer)] = &[
    ("pkcs8-pem", recognize_pem),
    ("identity-frame", recognize_frame),
];

fn recognize_pem(input: &[u8]) -> Option<RsaPublicKey> {
    let text = std::str::from_utf8(input).ok()?;
    RsaPublicKey::from_public_key_pem(text).ok()
}

fn recognize_frame(input: &[u8]) -> Option<RsaPublicKey> {
    let frame = KeyFrame::decode(input).ok()?;
    if frame.key_type != KEY_TYPE_RSA {
        return None;
    }
    RsaPublicKey::from_public_key_der(&frame.data).ok()
}

/// A peer's long-term public key in the one canonical encoding
///
/// The canonical form is the PKCS#8 (SubjectPublicKeyInfo) PEM with `\n`
/// line endings. Canonical keys are the map keys of the contacts registry
/// and the group membership roster, and the hash input of the subscriber
/// handshake; two encodings of the same key always normalize to the same
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl CanonicalKey {
    /// Normalize any accepted key representation to the canonical form
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Unrecognized`] when no recognizer accepts the
    /// input.
    pub fn normalize(input: &[u8]) -> Result<Self, KeyError> {
        for (format, recognize) in RECOGNIZERS {
            if let Some(key) = recognize(input) {
                tracing::trace!(format = %format, "normalized public key");
                return Self::from_rsa(&key);
            }
        }
        Err(KeyError::Unrecognized)
    }

    /// Canonicalize an RSA public key
    pub fn from_rsa(key: &RsaPublicKey) -> Result<Self, KeyError> {
        let pem = key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("pem export error: {}", e))?;
        Ok(Self(pem))
    }

    /// Parse the canonical PEM back into an RSA public key
    pub fn to_rsa(&self) -> Result<RsaPublicKey, KeyError> {
        RsaPublicKey::from_public_key_pem(&self.0)
            .map_err(|e| anyhow::anyhow!("canonical key does not parse: {}", e).into())
    }

    /// The canonical PEM text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short stable digest of the key for log lines
    pub fn fingerprint(&self) -> String {
        let mut name = multihash_b58(&[self.0.as_bytes()]);
        name.truncate(12);
        name
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::OsRng;
    use rsa::RsaPrivateKey;

    use super::*;

    fn test_key() -> RsaPublicKey {
        RsaPublicKey::from(&RsaPrivateKey::new(&mut OsRng, 1024).unwrap())
    }

    #[test]
    fn test_pem_form_is_idempotent() {
        let key = test_key();
        let canonical = CanonicalKey::from_rsa(&key).unwrap();

        let renormalized = CanonicalKey::normalize(canonical.as_str().as_bytes()).unwrap();
        assert_eq!(canonical, renormalized);
    }

    #[test]
    fn test_whitespace_is_canonicalized() {
        let key = test_key();
        let canonical = CanonicalKey::from_rsa(&key).unwrap();

        let crlf = canonical.as_str().replace('\n', "\r\n");
        let renormalized = CanonicalKey::normalize(crlf.as_bytes()).unwrap();
        assert_eq!(canonical, renormalized);
    }

    #[test]
    fn test_frame_form_agrees_with_pem_form() {
        let key = test_key();
        let canonical = CanonicalKey::from_rsa(&key).unwrap();

        let der = key.to_public_key_der().unwrap().into_vec();
        let framed = KeyFrame::rsa(der).to_bytes();
        let from_frame = CanonicalKey::normalize(&framed).unwrap();

        assert_eq!(canonical, from_frame);
    }

    #[test]
    fn test_unknown_forms_are_rejected() {
        assert!(matches!(
            CanonicalKey::normalize(b"not a key in any accepted encoding"),
            Err(KeyError::Unrecognized)
        ));

        // A well-formed frame with a non-RSA type tag is still rejected
        let framed = KeyFrame {
            key_type: 1,
            data: vec![0u8; 32],
        }
        .to_bytes();
        assert!(matches!(
            CanonicalKey::normalize(&framed),
            Err(KeyError::Unrecognized)
        ));
    }

    #[test]
    fn test_roundtrip_to_rsa() {
        let key = test_key();
        let canonical = CanonicalKey::from_rsa(&key).unwrap();
        assert_eq!(canonical.to_rsa().unwrap(), key);
    }

    #[test]
    fn test_fingerprint_is_short_and_stable() {
        let key = test_key();
        let canonical = CanonicalKey::from_rsa(&key).unwrap();
        assert_eq!(canonical.fingerprint(), canonical.fingerprint());
        assert!(canonical.fingerprint().len() <= 12);
    }
}
