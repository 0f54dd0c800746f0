//! Test scaffolding
//!
//! In-memory implementations of the external collaborators, plus a
//! [`TestParticipant`] bundling them behind an already-open readiness so
//! integration tests can stand up a participant in one call.

mod fs;
mod identity;
mod kv;
mod names;
mod participant;

pub use fs::MemoryProfileStore;
pub use identity::TestIdentity;
pub use kv::MemoryKeyStore;
pub use names::MemoryNameService;
pub use participant::TestParticipant;
