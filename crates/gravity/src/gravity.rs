//! The participant-facing handle
//!
//! [`Gravity`] wires the external collaborators (profile filesystem,
//! key-value store, node identity, optional naming service) into the
//! component surfaces and exposes every public operation of the core.
//! The handle is clone-cheap; all state lives in the profile tree and
//! the external stores.
//!
//! Every operation first waits on the readiness gates of the
//! collaborators it touches (the filesystem node coming up, the crypto
//! subsystem initializing), so callers can build the handle early and
//! release the gates when the environment is up.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::contacts::{ContactMap, ContactRecord, Contacts, ContactsError};
use crate::crypto::Secret;
use crate::fs::{FsError, ProfileFs, ProfileStore, Tree};
use crate::groups::{GroupError, GroupInfo, Groups};
use crate::identity::{CanonicalKey, NodeIdentity};
use crate::keystore::{KeyValueStore, KeystoreError, MasterKeyStore};
use crate::naming::{NameService, NamingError, Publisher};
use crate::readiness::Readiness;
use crate::subscribers::{HandshakeError, Subscribers};

/// Errors that can occur while building a [`Gravity`] handle
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborator: {0}")]
    Missing(&'static str),
}

/// Builder for [`Gravity`]
///
/// The profile store, key-value store, and node identity are required;
/// the naming service, the resolution fallback, and a non-open
/// [`Readiness`] are optional.
#[derive(Default)]
pub struct GravityBuilder {
    store: Option<Arc<dyn ProfileStore>>,
    keys: Option<Arc<dyn KeyValueStore>>,
    identity: Option<Arc<dyn NodeIdentity>>,
    names: Option<Arc<dyn NameService>>,
    fallback_profile_hash: Option<String>,
    readiness: Option<Readiness>,
}

impl GravityBuilder {
    pub fn profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn key_value_store(mut self, keys: Arc<dyn KeyValueStore>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn NodeIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn name_service(mut self, names: Arc<dyn NameService>) -> Self {
        self.names = Some(names);
        self
    }

    /// Hash returned by `profile_hash` when the naming service cannot
    /// resolve a peer
    pub fn fallback_profile_hash(mut self, hash: impl Into<String>) -> Self {
        self.fallback_profile_hash = Some(hash.into());
        self
    }

    /// Use caller-controlled readiness gates instead of already-open ones
    pub fn readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = Some(readiness);
        self
    }

    pub fn build(self) -> Result<Gravity, BuildError> {
        let store = self.store.ok_or(BuildError::Missing("profile store"))?;
        let keys = self.keys.ok_or(BuildError::Missing("key-value store"))?;
        let identity = self.identity.ok_or(BuildError::Missing("node identity"))?;
        let ready = self.readiness.unwrap_or_else(Readiness::open);

        let fs = ProfileFs::new(store);
        let master = MasterKeyStore::new(keys);
        let contacts = Contacts::new(fs.clone(), master.clone());
        let subscribers = Subscribers::new(fs.clone(), contacts.clone(), identity.clone());
        let groups = Groups::new(fs.clone(), master.clone(), contacts.clone(), identity.clone());
        let publisher = Publisher::new(fs.clone(), self.names, self.fallback_profile_hash);

        Ok(Gravity {
            fs,
            master,
            contacts,
            subscribers,
            groups,
            publisher,
            ready,
        })
    }
}

/// Handle on the protocol core of one participant's profile
#[derive(Clone)]
pub struct Gravity {
    fs: ProfileFs,
    master: MasterKeyStore,
    contacts: Contacts,
    subscribers: Subscribers,
    groups: Groups,
    publisher: Publisher,
    ready: Readiness,
}

impl Gravity {
    pub fn builder() -> GravityBuilder {
        GravityBuilder::default()
    }

    /// The readiness gates this handle waits on
    pub fn readiness(&self) -> &Readiness {
        &self.ready
    }

    // ---- master key ----

    /// Read the master key; fails until `reset_master_key` has run once
    pub async fn get_master_key(&self) -> Result<Secret, KeystoreError> {
        self.ready.crypto.wait().await;
        self.master.get().await
    }

    /// Store a caller-provided master key
    pub async fn set_master_key(&self, key: &Secret) -> Result<(), KeystoreError> {
        self.ready.crypto.wait().await;
        self.master.set(key).await
    }

    /// Generate, store, and return a fresh master key
    pub async fn reset_master_key(&self) -> Result<Secret, KeystoreError> {
        self.ready.crypto.wait().await;
        self.master.reset().await
    }

    // ---- contacts ----

    /// The contacts registry; an absent backing file reads as empty
    pub async fn get_contacts(&self) -> Result<ContactMap, ContactsError> {
        self.ready.wait_all().await;
        self.contacts.all().await
    }

    /// Merge a patch into one peer's contact record
    pub async fn upsert_contact(
        &self,
        peer: &CanonicalKey,
        patch: ContactRecord,
    ) -> Result<(), ContactsError> {
        self.ready.wait_all().await;
        self.contacts.upsert(peer, patch).await
    }

    // ---- subscriber handshake ----

    /// Subscribe to a peer, given their public key in any accepted form
    pub async fn add_subscriber(&self, peer_key: &[u8]) -> Result<Secret, HandshakeError> {
        self.ready.wait_all().await;
        self.subscribers.add_subscriber(peer_key).await
    }

    /// Recover the pairwise secret a peer chose for this node from their
    /// drop folder
    pub async fn test_decrypt_all_subscribers(
        &self,
        peer_subscribers: &Path,
    ) -> Result<Secret, HandshakeError> {
        self.ready.wait_all().await;
        self.subscribers
            .test_decrypt_all_subscribers(peer_subscribers)
            .await
    }

    // ---- groups ----

    /// Create a group over already-subscribed peers
    pub async fn create_group(
        &self,
        members: &[CanonicalKey],
        group_id: Option<&str>,
    ) -> Result<String, GroupError> {
        self.ready.wait_all().await;
        self.groups.create_group(members, group_id).await
    }

    /// This participant's copy of a group's key
    pub async fn get_group_key(&self, group: &str) -> Result<Secret, GroupError> {
        self.ready.wait_all().await;
        self.groups.get_group_key(group).await
    }

    /// A group's shared metadata; missing info reads as empty
    pub async fn get_group_info(&self, group: &str) -> Result<GroupInfo, GroupError> {
        self.ready.wait_all().await;
        self.groups.get_group_info(group).await
    }

    /// Merge nicknames into a group's membership roster
    pub async fn set_nicknames(
        &self,
        names: &BTreeMap<CanonicalKey, String>,
        group: &str,
    ) -> Result<(), GroupError> {
        self.ready.wait_all().await;
        self.groups.set_nicknames(names, group).await
    }

    /// The groups this profile carries
    pub async fn list_groups(&self) -> Result<Vec<String>, GroupError> {
        self.ready.wait_all().await;
        self.groups.list_groups().await
    }

    // ---- publication ----

    /// This participant's current profile root hash
    pub async fn get_my_profile_hash(&self) -> Result<String, NamingError> {
        self.ready.filesystem.wait().await;
        self.publisher.my_profile_hash().await
    }

    /// Push the current profile root to the naming service
    pub async fn publish_profile(&self) -> Result<String, NamingError> {
        self.ready.filesystem.wait().await;
        self.publisher.publish_profile().await
    }

    /// A peer's current profile root hash
    pub async fn get_profile_hash(&self, peer: &CanonicalKey) -> Result<String, NamingError> {
        self.ready.filesystem.wait().await;
        self.publisher.profile_hash(peer).await
    }

    // ---- tree access ----

    /// Recursively load a subtree of the profile
    pub async fn load_tree(&self, path: impl AsRef<Path>) -> Result<Tree, FsError> {
        self.ready.filesystem.wait().await;
        self.fs.load_tree(path).await
    }
}
