//! Encrypted contacts registry
//!
//! The registry maps a peer's canonical public key to the pairwise state
//! this participant holds for them, most importantly the `my-secret`
//! attribute: the symmetric key chosen for that peer during the
//! subscriber handshake. The whole map is one JSON document, encrypted
//! under the master key at `/private/contacts.json.enc`.
//!
//! Entries are grow-only within a session; there is no revocation here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::{Secret, SecretError};
use crate::fs::{FsError, ProfileFs};
use crate::identity::CanonicalKey;
use crate::keystore::{KeystoreError, MasterKeyStore};

/// Location of the registry in the profile tree
pub const CONTACTS_PATH: &str = "/private/contacts.json.enc";

/// Errors that can occur in the contacts registry
#[derive(Debug, thiserror::Error)]
pub enum ContactsError {
    #[error("contacts record is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("keystore error: {0}")]
    Keystore(#[from] KeystoreError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

/// Pairwise state held for one peer
///
/// `my-secret` is the base64url of the pairwise secret this participant
/// generated for the peer. Unknown attributes written by other versions
/// are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(rename = "my-secret", default, skip_serializing_if = "Option::is_none")]
    pub my_secret: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ContactRecord {
    /// Merge a patch into this record; set fields win
    pub fn merge(&mut self, patch: ContactRecord) {
        if patch.my_secret.is_some() {
            self.my_secret = patch.my_secret;
        }
        self.extra.extend(patch.extra);
    }

    /// The pairwise secret, decoded
    pub fn pairwise_secret(&self) -> Option<Result<Secret, SecretError>> {
        self.my_secret.as_deref().map(Secret::from_b64url)
    }
}

/// The full registry, keyed by canonical public key
pub type ContactMap = BTreeMap<CanonicalKey, ContactRecord>;

/// Encrypted registry of pairwise state, keyed by canonical public key
#[derive(Clone)]
pub struct Contacts {
    fs: ProfileFs,
    master: MasterKeyStore,
}

impl Contacts {
    pub fn new(fs: ProfileFs, master: MasterKeyStore) -> Self {
        Self { fs, master }
    }

    /// Load the registry; an absent backing file reads as empty
    pub async fn all(&self) -> Result<ContactMap, ContactsError> {
        let blob = match self.fs.read_opt(CONTACTS_PATH).await? {
            Some(blob) => blob,
            None => return Ok(ContactMap::new()),
        };
        let master = self.master.get().await?;
        let plain = master.decrypt(&blob)?;
        Ok(serde_json::from_slice(&plain)?)
    }

    /// Look up one peer's record
    pub async fn get(&self, key: &CanonicalKey) -> Result<Option<ContactRecord>, ContactsError> {
        Ok(self.all().await?.remove(key))
    }

    /// Merge a patch into a peer's record and rewrite the registry
    pub async fn upsert(
        &self,
        key: &CanonicalKey,
        patch: ContactRecord,
    ) -> Result<(), ContactsError> {
        let mut contacts = self.all().await?;
        contacts.entry(key.clone()).or_default().merge(patch);

        let master = self.master.get().await?;
        let plain = serde_json::to_vec(&contacts)?;
        let blob = master.encrypt(&plain)?;
        self.fs.write(CONTACTS_PATH, &blob).await?;
        tracing::debug!(peer = %key.fingerprint(), "contact upserted");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::testkit::{MemoryKeyStore, MemoryProfileStore, TestIdentity};

    async fn registry() -> Contacts {
        let fs = ProfileFs::new(Arc::new(MemoryProfileStore::new()));
        let master = MasterKeyStore::new(Arc::new(MemoryKeyStore::new()));
        master.reset().await.unwrap();
        Contacts::new(fs, master)
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let contacts = registry().await;
        assert!(contacts.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_read_back() {
        let contacts = registry().await;
        let peer = TestIdentity::generate().canonical_key();
        let secret = Secret::generate();

        contacts
            .upsert(
                &peer,
                ContactRecord {
                    my_secret: Some(secret.to_b64url()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = contacts.get(&peer).await.unwrap().unwrap();
        assert_eq!(
            record.pairwise_secret().unwrap().unwrap(),
            secret
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_existing_secret() {
        let contacts = registry().await;
        let peer = TestIdentity::generate().canonical_key();
        let secret = Secret::generate();

        contacts
            .upsert(
                &peer,
                ContactRecord {
                    my_secret: Some(secret.to_b64url()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // A patch that only carries an extra attribute must not clobber my-secret
        let mut extra = BTreeMap::new();
        extra.insert("alias".to_string(), serde_json::json!("bob"));
        contacts
            .upsert(
                &peer,
                ContactRecord {
                    my_secret: None,
                    extra,
                },
            )
            .await
            .unwrap();

        let record = contacts.get(&peer).await.unwrap().unwrap();
        assert_eq!(record.my_secret, Some(secret.to_b64url()));
        assert_eq!(record.extra["alias"], serde_json::json!("bob"));
    }

    #[tokio::test]
    async fn test_registry_is_encrypted_on_disk() {
        let store = Arc::new(MemoryProfileStore::new());
        let fs = ProfileFs::new(store.clone());
        let master = MasterKeyStore::new(Arc::new(MemoryKeyStore::new()));
        master.reset().await.unwrap();
        let contacts = Contacts::new(fs.clone(), master);

        let peer = TestIdentity::generate().canonical_key();
        contacts
            .upsert(&peer, ContactRecord::default())
            .await
            .unwrap();

        let raw = fs.read(CONTACTS_PATH).await.unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&raw).is_err());
    }
}
