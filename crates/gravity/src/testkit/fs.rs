//! In-memory profile filesystem
//!
//! A [`ProfileStore`] over plain maps, with content hashing that mimics
//! the real filesystem: a file's hash covers its bytes, a directory's
//! hash covers its (sorted) children, so the root hash changes whenever
//! anything under it does.
//!
//! Peers' published trees can be attached read-only under a prefix with
//! [`MemoryProfileStore::link_peer`], standing in for fetch-by-root-hash
//! in the real content-addressed filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::crypto::hash::multihash_b58;
use crate::fs::{DirEntry, EntryKind, FsError, ProfileStore, Stat};

#[derive(Default)]
struct MemInner {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

/// A [`ProfileStore`] backed by maps; for tests only
pub struct MemoryProfileStore {
    inner: Mutex<MemInner>,
    links: Mutex<BTreeMap<PathBuf, Arc<MemoryProfileStore>>>,
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

fn norm(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for part in path.components() {
        if let Component::Normal(name) = part {
            out.push(name);
        }
    }
    out
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        let mut inner = MemInner::default();
        inner.dirs.insert(PathBuf::from("/"));
        Self {
            inner: Mutex::new(inner),
            links: Mutex::new(BTreeMap::new()),
        }
    }

    /// Attach another participant's tree read-only under `prefix`
    pub fn link_peer(&self, prefix: impl AsRef<Path>, peer: Arc<MemoryProfileStore>) {
        self.links.lock().unwrap().insert(norm(prefix.as_ref()), peer);
    }

    /// Resolve a path through the peer links, if it falls under one
    fn route(&self, path: &Path) -> Option<(Arc<MemoryProfileStore>, PathBuf)> {
        let path = norm(path);
        let links = self.links.lock().unwrap();
        for (prefix, peer) in links.iter() {
            if let Ok(rest) = path.strip_prefix(prefix) {
                return Some((peer.clone(), Path::new("/").join(rest)));
            }
        }
        None
    }

    fn children_of(inner: &MemInner, path: &Path) -> Vec<(String, EntryKind)> {
        let mut out = Vec::new();
        for file in inner.files.keys() {
            if file.parent() == Some(path) {
                let name = file.file_name().unwrap().to_string_lossy().into_owned();
                out.push((name, EntryKind::File));
            }
        }
        for dir in inner.dirs.iter() {
            if dir.parent() == Some(path) {
                let name = dir.file_name().unwrap().to_string_lossy().into_owned();
                out.push((name, EntryKind::Directory));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn size_of(inner: &MemInner, path: &Path) -> u64 {
        if let Some(bytes) = inner.files.get(path) {
            return bytes.len() as u64;
        }
        Self::children_of(inner, path)
            .into_iter()
            .map(|(name, _)| Self::size_of(inner, &path.join(name)))
            .sum()
    }

    fn hash_of(inner: &MemInner, path: &Path) -> String {
        if let Some(bytes) = inner.files.get(path) {
            return multihash_b58(&[bytes]);
        }
        let mut digest_input = Vec::new();
        for (name, _) in Self::children_of(inner, path) {
            let child = Self::hash_of(inner, &path.join(&name));
            digest_input.extend_from_slice(name.as_bytes());
            digest_input.push(0);
            digest_input.extend_from_slice(child.as_bytes());
            digest_input.push(0);
        }
        multihash_b58(&[b"dir", &digest_input])
    }

    fn stat_sync(&self, path: &Path) -> Result<Stat, FsError> {
        let path = norm(path);
        let inner = self.inner.lock().unwrap();
        let kind = if inner.files.contains_key(&path) {
            EntryKind::File
        } else if inner.dirs.contains(&path) {
            EntryKind::Directory
        } else {
            return Err(FsError::PathMissing(path));
        };
        Ok(Stat {
            kind,
            size: Self::size_of(&inner, &path),
            hash: Self::hash_of(&inner, &path),
        })
    }

    fn ls_sync(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let path = norm(path);
        let inner = self.inner.lock().unwrap();
        if !inner.dirs.contains(&path) {
            return Err(FsError::PathMissing(path));
        }
        Ok(Self::children_of(&inner, &path)
            .into_iter()
            .map(|(name, kind)| {
                let child = path.join(&name);
                DirEntry {
                    kind,
                    size: Self::size_of(&inner, &child),
                    hash: Self::hash_of(&inner, &child),
                    name,
                }
            })
            .collect())
    }

    fn read_sync(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let path = norm(path);
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .get(&path)
            .cloned()
            .ok_or(FsError::PathMissing(path))
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        match self.route(path) {
            Some((peer, rest)) => peer.read_sync(&rest),
            None => self.read_sync(path),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8], create_parents: bool) -> Result<(), FsError> {
        if self.route(path).is_some() {
            return Err(anyhow::anyhow!("peer view is read-only").into());
        }
        let path = norm(path);
        let mut inner = self.inner.lock().unwrap();
        if inner.dirs.contains(&path) {
            return Err(anyhow::anyhow!("is a directory: {}", path.display()).into());
        }
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !inner.dirs.contains(&parent) {
            if !create_parents {
                return Err(FsError::PathMissing(parent));
            }
            let mut ancestor = parent.clone();
            loop {
                if inner.files.contains_key(&ancestor) {
                    return Err(
                        anyhow::anyhow!("not a directory: {}", ancestor.display()).into()
                    );
                }
                inner.dirs.insert(ancestor.clone());
                match ancestor.parent() {
                    Some(next) => ancestor = next.to_path_buf(),
                    None => break,
                }
            }
        }
        inner.files.insert(path, bytes.to_vec());
        Ok(())
    }

    async fn ls(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        match self.route(path) {
            Some((peer, rest)) => peer.ls_sync(&rest),
            None => self.ls_sync(path),
        }
    }

    async fn stat(&self, path: &Path) -> Result<Stat, FsError> {
        match self.route(path) {
            Some((peer, rest)) => peer.stat_sync(&rest),
            None => self.stat_sync(path),
        }
    }

    async fn mkdir(&self, path: &Path, parents: bool) -> Result<(), FsError> {
        if self.route(path).is_some() {
            return Err(anyhow::anyhow!("peer view is read-only").into());
        }
        let path = norm(path);
        let mut inner = self.inner.lock().unwrap();
        if inner.files.contains_key(&path) {
            return Err(anyhow::anyhow!("is a file: {}", path.display()).into());
        }
        if parents {
            let mut ancestor = path.clone();
            loop {
                if inner.files.contains_key(&ancestor) {
                    return Err(
                        anyhow::anyhow!("not a directory: {}", ancestor.display()).into()
                    );
                }
                inner.dirs.insert(ancestor.clone());
                match ancestor.parent() {
                    Some(next) => ancestor = next.to_path_buf(),
                    None => break,
                }
            }
        } else {
            let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
            if !inner.dirs.contains(&parent) {
                return Err(FsError::PathMissing(parent));
            }
            inner.dirs.insert(path);
        }
        Ok(())
    }

    async fn rm(&self, path: &Path, recursive: bool) -> Result<(), FsError> {
        if self.route(path).is_some() {
            return Err(anyhow::anyhow!("peer view is read-only").into());
        }
        let path = norm(path);
        let mut inner = self.inner.lock().unwrap();
        if inner.files.remove(&path).is_some() {
            return Ok(());
        }
        if !inner.dirs.contains(&path) {
            return Err(FsError::PathMissing(path));
        }
        let has_children = !Self::children_of(&inner, &path).is_empty();
        if has_children && !recursive {
            return Err(anyhow::anyhow!("directory not empty: {}", path.display()).into());
        }
        inner.files.retain(|file, _| !file.starts_with(&path));
        inner.dirs.retain(|dir| !dir.starts_with(&path));
        // Removing "/" still leaves an empty root behind
        inner.dirs.insert(PathBuf::from("/"));
        Ok(())
    }
}
