//! In-memory naming service

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::identity::CanonicalKey;
use crate::naming::NameService;

/// A [`NameService`] over a map; for tests only
///
/// `publish` records the root under the bound owner key; `resolve` is a
/// plain lookup.
#[derive(Default)]
pub struct MemoryNameService {
    owner: Mutex<Option<CanonicalKey>>,
    records: Mutex<BTreeMap<CanonicalKey, String>>,
}

impl MemoryNameService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whose roots `publish` records
    pub fn bind_owner(&self, owner: CanonicalKey) {
        *self.owner.lock().unwrap() = Some(owner);
    }

    /// Record a peer's root directly
    pub fn set(&self, peer: CanonicalKey, root: impl Into<String>) {
        self.records.lock().unwrap().insert(peer, root.into());
    }
}

#[async_trait::async_trait]
impl NameService for MemoryNameService {
    async fn publish(&self, root: &str) -> anyhow::Result<()> {
        let owner = self
            .owner
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("naming service has no bound owner"))?;
        self.records.lock().unwrap().insert(owner, root.to_string());
        Ok(())
    }

    async fn resolve(&self, peer: &CanonicalKey) -> anyhow::Result<Option<String>> {
        Ok(self.records.lock().unwrap().get(peer).cloned())
    }
}
