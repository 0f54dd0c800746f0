//! Profile publication and resolution
//!
//! A profile is published by root hash: the hash of `/` is the public
//! profile id, and peers learn each other's current root through an
//! external naming service. The service is a collaborator behind the
//! [`NameService`] trait; environments without one can configure a
//! fallback hash for resolution (useful in tests and during bring-up).

use std::sync::Arc;

use crate::fs::{FsError, ProfileFs};
use crate::identity::CanonicalKey;

/// External naming service: publish own root, resolve a peer's
#[async_trait::async_trait]
pub trait NameService: Send + Sync {
    /// Publish this participant's current profile root.
    async fn publish(&self, root: &str) -> anyhow::Result<()>;
    /// Resolve a peer's current profile root, `None` when unknown.
    async fn resolve(&self, peer: &CanonicalKey) -> anyhow::Result<Option<String>>;
}

/// Errors that can occur during publication or resolution
#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    /// The peer's root could not be resolved and no fallback is set.
    #[error("no resolution for peer {0}")]
    Unresolved(String),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error("naming error: {0}")]
    Default(#[from] anyhow::Error),
}

/// The publication surface of the profile
#[derive(Clone)]
pub struct Publisher {
    fs: ProfileFs,
    names: Option<Arc<dyn NameService>>,
    fallback: Option<String>,
}

impl Publisher {
    pub fn new(
        fs: ProfileFs,
        names: Option<Arc<dyn NameService>>,
        fallback: Option<String>,
    ) -> Self {
        Self {
            fs,
            names,
            fallback,
        }
    }

    /// This participant's current profile root hash
    pub async fn my_profile_hash(&self) -> Result<String, NamingError> {
        Ok(self.fs.stat("/").await?.hash)
    }

    /// Push the current root to the naming service, returning the hash
    pub async fn publish_profile(&self) -> Result<String, NamingError> {
        let root = self.my_profile_hash().await?;
        if let Some(names) = &self.names {
            names.publish(&root).await?;
            tracing::info!(root = %root, "profile root published");
        }
        Ok(root)
    }

    /// Resolve a peer's current profile root hash
    ///
    /// Consults the naming service when configured; falls back to the
    /// configured hash otherwise.
    pub async fn profile_hash(&self, peer: &CanonicalKey) -> Result<String, NamingError> {
        if let Some(names) = &self.names {
            if let Some(root) = names.resolve(peer).await? {
                return Ok(root);
            }
        }
        self.fallback
            .clone()
            .ok_or_else(|| NamingError::Unresolved(peer.fingerprint()))
    }
}
