//! Protobuf frame for identity-subsystem public keys
//!
//! The filesystem node's identity subsystem distributes public keys as a
//! two-field protobuf message: a key-type tag and the key material as a
//! length-delimited bytes field. For RSA the material is an X.509
//! SubjectPublicKeyInfo in DER.

use prost::Message;

/// Key-type tag for RSA
pub const KEY_TYPE_RSA: i32 = 0;

/// The identity subsystem's public-key envelope
#[derive(Clone, PartialEq, Message)]
pub struct KeyFrame {
    #[prost(int32, tag = "1")]
    pub key_type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

impl KeyFrame {
    /// Frame an RSA SubjectPublicKeyInfo DER
    pub fn rsa(der: Vec<u8>) -> Self {
        Self {
            key_type: KEY_TYPE_RSA,
            data: der,
        }
    }

    /// Serialize the frame to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let frame = KeyFrame::rsa(vec![1, 2, 3, 4]);
        let bytes = frame.to_bytes();
        let decoded = KeyFrame::decode(&bytes[..]).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.key_type, KEY_TYPE_RSA);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(KeyFrame::decode(&b"definitely not protobuf"[..]).is_err());
    }
}
