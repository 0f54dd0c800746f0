//! Fixed node identity for tests

use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::identity::{CanonicalKey, KeyError, KeyFrame, NodeIdentity, NodeKeys};

/// Key size for test identities
///
/// Small on purpose: generation dominates test runtime and the protocol
/// is key-size agnostic.
const TEST_KEY_BITS: usize = 1024;

/// A [`NodeIdentity`] with a fixed, freshly generated RSA keypair
pub struct TestIdentity {
    keys: NodeKeys,
}

impl TestIdentity {
    pub fn generate() -> Self {
        let private = RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS)
            .expect("failed to generate test keypair");
        let public = RsaPublicKey::from(&private);
        Self {
            keys: NodeKeys { public, private },
        }
    }

    pub fn keys(&self) -> &NodeKeys {
        &self.keys
    }

    pub fn canonical_key(&self) -> CanonicalKey {
        self.keys.canonical().expect("test key canonicalizes")
    }

    /// The public key as the identity subsystem's protobuf frame
    pub fn framed_key(&self) -> Vec<u8> {
        let der = self
            .keys
            .public
            .to_public_key_der()
            .expect("test key exports")
            .into_vec();
        KeyFrame::rsa(der).to_bytes()
    }
}

#[async_trait::async_trait]
impl NodeIdentity for TestIdentity {
    async fn keypair(&self) -> Result<NodeKeys, KeyError> {
        Ok(self.keys.clone())
    }
}
