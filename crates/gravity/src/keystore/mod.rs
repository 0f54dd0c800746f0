//! Master-key persistence
//!
//! The participant's root symmetric key lives in an external key-value
//! store behind the [`KeyValueStore`] trait. The key is created once by
//! [`MasterKeyStore::reset`] and read back on every operation that needs
//! it; there is no automatic generation on first read.

use std::sync::Arc;

use crate::crypto::{codec, Secret};

/// Storage key for the master key in the external key-value store
pub const MASTER_KEY_NAME: &str = "gravity-master-key";

/// Errors that can occur in the master-key store
#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    /// The external store has no master key yet.
    #[error("no master key in the key store")]
    NoMasterKey,
    #[error("stored master key is malformed: {0}")]
    Malformed(anyhow::Error),
    #[error("key store error: {0}")]
    Default(#[from] anyhow::Error),
}

/// External key-value store for local secrets
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value, `None` when the key is absent.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    /// Store a value, overwriting any previous one.
    async fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
}

/// Typed access to the participant's master key
///
/// The key is stored as the url-safe base64 of its raw bytes. The store
/// is read-mostly; the only writer is [`reset`](MasterKeyStore::reset).
#[derive(Clone)]
pub struct MasterKeyStore {
    store: Arc<dyn KeyValueStore>,
}

impl MasterKeyStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the master key
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::NoMasterKey`] when the store is empty;
    /// callers must have executed [`reset`](Self::reset) at least once.
    pub async fn get(&self) -> Result<Secret, KeystoreError> {
        let value = self
            .store
            .get(MASTER_KEY_NAME)
            .await?
            .ok_or(KeystoreError::NoMasterKey)?;
        let text = String::from_utf8(value)
            .map_err(|e| KeystoreError::Malformed(anyhow::anyhow!("not utf-8: {}", e)))?;
        let bytes = codec::b64url_decode(&text)
            .map_err(|e| KeystoreError::Malformed(anyhow::anyhow!("not base64url: {}", e)))?;
        Secret::from_slice(&bytes).map_err(|e| KeystoreError::Malformed(e.into()))
    }

    /// Store a caller-provided master key
    pub async fn set(&self, key: &Secret) -> Result<(), KeystoreError> {
        self.store
            .put(MASTER_KEY_NAME, key.to_b64url().as_bytes())
            .await?;
        Ok(())
    }

    /// Generate a fresh master key, store it, and return it
    pub async fn reset(&self) -> Result<Secret, KeystoreError> {
        let key = Secret::generate();
        self.set(&key).await?;
        tracing::info!("master key reset");
        Ok(key)
    }
}
