//! A fully wired participant for integration tests

use std::path::Path;
use std::sync::Arc;

use crate::gravity::Gravity;
use crate::identity::CanonicalKey;

use super::fs::MemoryProfileStore;
use super::identity::TestIdentity;
use super::kv::MemoryKeyStore;
use super::names::MemoryNameService;

/// A participant with in-memory collaborators and a fresh master key
pub struct TestParticipant {
    /// A name for debugging output
    pub name: String,
    gravity: Gravity,
    store: Arc<MemoryProfileStore>,
    identity: Arc<TestIdentity>,
    names: Arc<MemoryNameService>,
}

impl TestParticipant {
    /// Stand up a participant: fresh identity, empty profile tree, reset
    /// master key, open readiness
    pub async fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let store = Arc::new(MemoryProfileStore::new());
        let identity = Arc::new(TestIdentity::generate());
        let names = Arc::new(MemoryNameService::new());
        names.bind_owner(identity.canonical_key());

        let gravity = Gravity::builder()
            .profile_store(store.clone())
            .key_value_store(Arc::new(MemoryKeyStore::new()))
            .identity(identity.clone())
            .name_service(names.clone())
            .build()
            .expect("test participant builds");

        gravity
            .reset_master_key()
            .await
            .expect("fresh master key");

        tracing::debug!(participant = %name, "test participant ready");
        Self {
            name,
            gravity,
            store,
            identity,
            names,
        }
    }

    pub fn gravity(&self) -> &Gravity {
        &self.gravity
    }

    pub fn canonical_key(&self) -> CanonicalKey {
        self.identity.canonical_key()
    }

    pub fn identity(&self) -> &TestIdentity {
        &self.identity
    }

    pub fn store(&self) -> &Arc<MemoryProfileStore> {
        &self.store
    }

    pub fn names(&self) -> &Arc<MemoryNameService> {
        &self.names
    }

    /// Make `other`'s published tree readable under `prefix`
    pub fn link_peer(&self, prefix: impl AsRef<Path>, other: &TestParticipant) {
        self.store.link_peer(prefix, other.store.clone());
    }
}
