//! URL-safe base64 text codec
//!
//! Every base64 string in the profile tree (pairwise secrets in contacts,
//! group directory names, the stored master key) uses the URL-safe
//! alphabet without padding. Decoding tolerates trailing padding so that
//! records written by padding-happy producers still parse.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Errors that can occur while decoding base64url text
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid base64url: {0}")]
    Invalid(#[from] base64::DecodeError),
}

/// Encode bytes as url-safe base64 without padding
pub fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode url-safe base64, tolerating trailing `=` padding
pub fn b64url_decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = text.trim_end_matches('=');
    Ok(URL_SAFE_NO_PAD.decode(trimmed)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"\x00\x01\xfe\xffarbitrary bytes";
        let text = b64url_encode(data);
        assert!(!text.contains('='));
        assert_eq!(b64url_decode(&text).unwrap(), data);
    }

    #[test]
    fn test_url_safe_alphabet() {
        // 0xfb 0xff encodes to characters outside the standard alphabet
        let text = b64url_encode(&[0xfb, 0xff, 0xfe]);
        assert!(!text.contains('+'));
        assert!(!text.contains('/'));
    }

    #[test]
    fn test_tolerant_padding() {
        let data = b"pad me";
        let padded = format!("{}==", b64url_encode(data));
        assert_eq!(b64url_decode(&padded).unwrap(), data);
    }

    #[test]
    fn test_invalid_input() {
        assert!(b64url_decode("not base64 at all!").is_err());
    }
}
