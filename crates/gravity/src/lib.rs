/**
 * Contacts registry.
 *  Encrypted mapping from a peer's canonical key
 *  to the pairwise state held for them.
 */
pub mod contacts;
/**
 * Cryptographic types and operations.
 *  - Symmetric AEAD secrets
 *  - RSA-OAEP hybrid sealing
 *  - Multihash content naming and base64url text
 */
pub mod crypto;
/**
 * Typed access to the external content-addressed
 *  filesystem holding the profile tree.
 */
pub mod fs;
/**
 * The participant-facing handle and its builder.
 */
pub mod gravity;
/**
 * Group engine.
 *  Creates groups, delivers the group key to each
 *  member at an unlinkable filename, and manages
 *  the encrypted membership roster.
 */
pub mod groups;
/**
 * Participant identity: canonical public keys,
 *  the format-normalizer pipeline, and the node
 *  identity seam.
 */
pub mod identity;
/**
 * Master-key persistence over the external
 *  key-value store.
 */
pub mod keystore;
/**
 * Profile publication: own root hash, naming
 *  service resolution.
 */
pub mod naming;
/**
 * One-shot readiness barriers gating the public
 *  operations.
 */
pub mod readiness;
/**
 * Subscriber handshake: sealed pairwise-secret
 *  drops and trial decryption.
 */
pub mod subscribers;
/**
 * In-memory collaborators and participant bundles
 *  for tests.
 */
pub mod testkit;

pub mod prelude {
    pub use crate::contacts::{ContactMap, ContactRecord, Contacts, ContactsError};
    pub use crate::crypto::{Secret, SecretError};
    pub use crate::fs::{ProfileFs, ProfileStore, Tree};
    pub use crate::gravity::{Gravity, GravityBuilder};
    pub use crate::groups::{GroupError, GroupInfo, Groups};
    pub use crate::identity::{CanonicalKey, KeyError, NodeIdentity, NodeKeys};
    pub use crate::keystore::{KeyValueStore, KeystoreError, MasterKeyStore};
    pub use crate::naming::{NameService, NamingError, Publisher};
    pub use crate::readiness::{Gate, Readiness};
    pub use crate::subscribers::{HandshakeError, Subscribers};
}
