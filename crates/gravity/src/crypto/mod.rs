//! Cryptographic primitives for the profile core
//!
//! This module provides the building blocks the rest of the crate composes:
//!
//! - **Symmetric encryption**: ChaCha20-Poly1305 AEAD with a prepended nonce
//! - **Asymmetric sealing**: RSA-OAEP hybrid encryption toward a peer's
//!   long-term public key
//! - **Content hashing**: SHA-256 emitted as Base58 of the multihash frame
//! - **Text codec**: URL-safe base64 without padding
//!
//! # Key Hierarchy
//!
//! Three layers of symmetric [`Secret`]s flow through these primitives:
//!
//! 1. The **master key** encrypts the participant's private records
//!    (contacts, their own per-group key entry).
//! 2. A **pairwise secret** is chosen per peer and delivered once via an
//!    asymmetrically sealed drop (see [`asym`]).
//! 3. A **group key** encrypts a group's shared metadata and is delivered
//!    to each member under their pairwise secret.

pub mod asym;
pub mod codec;
pub mod hash;
mod secret;

pub use secret::{Secret, SecretError, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
