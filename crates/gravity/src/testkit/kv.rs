//! In-memory key-value store

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::keystore::KeyValueStore;

/// A [`KeyValueStore`] backed by a map; for tests only
#[derive(Default)]
pub struct MemoryKeyStore {
    map: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKeyStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
