//! Typed facade over the profile filesystem

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::store::{DirEntry, EntryKind, FsError, ProfileStore, Stat};

/// A lazily loaded subtree of the profile
///
/// Directories carry their children under `contents`; files do not have
/// the field at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub hash: String,
    #[serde(rename = "contents", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, Tree>>,
}

/// Clone-cheap handle on the profile filesystem
///
/// Every write creates parent directories and truncates existing
/// content, so callers never sequence `mkdir` themselves.
#[derive(Clone)]
pub struct ProfileFs {
    store: Arc<dyn ProfileStore>,
}

impl ProfileFs {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, FsError> {
        self.store.read(path.as_ref()).await
    }

    /// Read a file, mapping "path missing" to `None`
    pub async fn read_opt(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>, FsError> {
        match self.store.read(path.as_ref()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.is_missing() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn write(&self, path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), FsError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "write");
        self.store.write(path, bytes, true).await
    }

    pub async fn ls(&self, path: impl AsRef<Path>) -> Result<Vec<DirEntry>, FsError> {
        self.store.ls(path.as_ref()).await
    }

    /// List a directory, mapping "path missing" to an empty listing
    pub async fn ls_opt(&self, path: impl AsRef<Path>) -> Result<Vec<DirEntry>, FsError> {
        match self.store.ls(path.as_ref()).await {
            Ok(entries) => Ok(entries),
            Err(e) if e.is_missing() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn stat(&self, path: impl AsRef<Path>) -> Result<Stat, FsError> {
        self.store.stat(path.as_ref()).await
    }

    pub async fn mkdir_all(&self, path: impl AsRef<Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "mkdir");
        self.store.mkdir(path, true).await
    }

    pub async fn rm_all(&self, path: impl AsRef<Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "rm");
        self.store.rm(path, true).await
    }

    /// Recursively load the subtree rooted at `path`
    ///
    /// The profile tree is acyclic by construction, so this is a plain
    /// recursive walk.
    pub async fn load_tree(&self, path: impl AsRef<Path>) -> Result<Tree, FsError> {
        self.load_tree_inner(path.as_ref().to_path_buf()).await
    }

    fn load_tree_inner(&self, path: PathBuf) -> BoxFuture<'_, Result<Tree, FsError>> {
        async move {
            let stat = self.stat(&path).await?;
            let children = match stat.kind {
                EntryKind::File => None,
                EntryKind::Directory => {
                    let mut children = BTreeMap::new();
                    for entry in self.ls(&path).await? {
                        let child = self.load_tree_inner(path.join(&entry.name)).await?;
                        children.insert(entry.name, child);
                    }
                    Some(children)
                }
            };
            Ok(Tree {
                kind: stat.kind,
                size: stat.size,
                hash: stat.hash,
                children,
            })
        }
        .boxed()
    }
}
