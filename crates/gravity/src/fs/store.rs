//! The external filesystem surface

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors reported by the filesystem
///
/// "Path does not exist" is its own variant so that callers can recover
/// from it structurally (an absent registry file reads as an empty
/// registry) while every other failure propagates.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("path missing: {0}")]
    PathMissing(PathBuf),
    #[error("filesystem error: {0}")]
    Default(#[from] anyhow::Error),
}

impl FsError {
    /// Whether this error means "the path does not exist"
    pub fn is_missing(&self) -> bool {
        matches!(self, FsError::PathMissing(_))
    }
}

/// What kind of entry a path names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Stat of a single path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub kind: EntryKind,
    pub size: u64,
    /// Content hash of the entry (the root's hash is the profile id)
    pub hash: String,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub hash: String,
}

/// External content-addressed filesystem with a path-based surface
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read a file's full contents.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;
    /// Write a file, truncating existing content. With `create_parents`,
    /// missing ancestor directories are created.
    async fn write(&self, path: &Path, bytes: &[u8], create_parents: bool) -> Result<(), FsError>;
    /// List a directory.
    async fn ls(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;
    /// Stat a path.
    async fn stat(&self, path: &Path) -> Result<Stat, FsError>;
    /// Create a directory, with ancestors when `parents` is set.
    async fn mkdir(&self, path: &Path, parents: bool) -> Result<(), FsError>;
    /// Remove a path; `recursive` is required for non-empty directories.
    async fn rm(&self, path: &Path, recursive: bool) -> Result<(), FsError>;
}
