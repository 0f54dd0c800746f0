//! SHA-256 content hashing with multihash framing
//!
//! Filenames in the profile tree that must be derivable by a reader
//! (subscriber drops, per-member group entries) are the Base58-btc
//! encoding of the full multihash frame `0x12 0x20 || SHA-256(input)`,
//! so decoders can recognize the hash function from the name alone.

use sha2::{Digest, Sha256};

/// Multicodec code for SHA2-256
const SHA2_256_CODE: u8 = 0x12;
/// Digest length of SHA2-256 in bytes
const SHA2_256_LEN: u8 = 32;

/// Hash the concatenation of `parts` and emit Base58 of the multihash frame
pub fn multihash_b58(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();

    let mut framed = Vec::with_capacity(2 + digest.len());
    framed.push(SHA2_256_CODE);
    framed.push(SHA2_256_LEN);
    framed.extend_from_slice(&digest);

    bs58::encode(framed).into_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = multihash_b58(&[b"hello", b"world"]);
        let b = multihash_b58(&[b"hello", b"world"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_concatenation() {
        // Hashing the parts is the same as hashing their concatenation
        assert_eq!(multihash_b58(&[b"hello", b"world"]), multihash_b58(&[b"helloworld"]));
    }

    #[test]
    fn test_distinct_inputs_distinct_names() {
        assert_ne!(multihash_b58(&[b"salt-a"]), multihash_b58(&[b"salt-b"]));
    }

    #[test]
    fn test_known_vector() {
        // SHA-256("") framed as 0x12 0x20 || digest, in base58btc
        assert_eq!(
            multihash_b58(&[]),
            "QmdfTbBqBPQ7VNxZEYEj14VmRuZBkqFbiwReogJgS1zR1n"
        );
    }
}
