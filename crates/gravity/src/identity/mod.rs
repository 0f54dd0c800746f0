//! Participant identity and public-key normalization
//!
//! Peers are addressed everywhere in the profile tree by their long-term
//! RSA public key in one canonical encoding, the [`CanonicalKey`]. Keys
//! arrive in more than one representation (the canonical PEM itself, or
//! the protobuf frame the filesystem node's identity subsystem hands
//! out); a pipeline of format recognizers converts any accepted form to
//! the canonical one and rejects the rest.
//!
//! This node's own keypair comes from the external identity subsystem
//! behind the [`NodeIdentity`] trait.

mod canonical;
mod proto;

use rsa::{RsaPrivateKey, RsaPublicKey};

pub use canonical::{CanonicalKey, KeyError};
pub use proto::{KeyFrame, KEY_TYPE_RSA};

/// This node's long-term asymmetric keypair
#[derive(Clone)]
pub struct NodeKeys {
    pub public: RsaPublicKey,
    pub private: RsaPrivateKey,
}

impl NodeKeys {
    /// The canonical encoding of this node's public key
    pub fn canonical(&self) -> Result<CanonicalKey, KeyError> {
        CanonicalKey::from_rsa(&self.public)
    }
}

/// External node identity subsystem
///
/// Implementations hand out the long-term keypair of the participant this
/// process runs as. Obtaining it may suspend (the underlying node loads
/// or unlocks the key on first use).
#[async_trait::async_trait]
pub trait NodeIdentity: Send + Sync {
    async fn keypair(&self) -> Result<NodeKeys, KeyError>;
}
