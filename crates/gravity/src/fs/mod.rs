//! Profile filesystem access
//!
//! The profile tree lives in an external content-addressed filesystem
//! that exposes a path-based surface. [`ProfileStore`] is that surface as
//! an async trait; [`ProfileFs`] is the typed facade the rest of the
//! crate uses, adding create-parents writes, structural "missing path"
//! detection, and a recursive tree loader.

mod adapter;
mod store;

pub use adapter::{ProfileFs, Tree};
pub use store::{DirEntry, EntryKind, FsError, ProfileStore, Stat};
