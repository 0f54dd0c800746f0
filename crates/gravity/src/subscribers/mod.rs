//! Subscriber handshake
//!
//! Subscribing to a peer establishes the pairwise secret this
//! participant will use toward them. The secret is delivered exactly
//! once, as a sealed drop in this participant's own `/subscribers`
//! folder:
//!
//! - the plaintext is `Hello <canonical key of the peer> : <b64(secret)>`
//! - the filename is the Base58 multihash of that plaintext, so a rewrite
//!   of the same introduction lands on the same name
//! - the contents are the plaintext sealed toward the peer's public key
//!
//! The peer discovers "the drop meant for me" by trial-decrypting every
//! entry of the folder with their private key; a drop is theirs iff it
//! opens **and** begins with the `Hello ` marker. Trials run
//! concurrently and the first hit wins.

mod race;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::contacts::{ContactRecord, Contacts, ContactsError};
use crate::crypto::asym::{self, AsymError};
use crate::crypto::codec::{self, CodecError};
use crate::crypto::hash::multihash_b58;
use crate::crypto::{Secret, SecretError};
use crate::fs::{FsError, ProfileFs};
use crate::identity::{CanonicalKey, KeyError, NodeIdentity};

pub use race::race_ok;

/// The drop folder in the profile tree
pub const SUBSCRIBERS_DIR: &str = "/subscribers";

/// Authentication marker prefixing every drop plaintext
const HELLO_PREFIX: &str = "Hello ";
/// Separator between the peer key and the secret in a drop plaintext
const SECRET_SEPARATOR: &str = " : ";

/// Errors that can occur during the handshake
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// No entry in the peer's drop folder trial-decrypts for this node.
    #[error("no subscriber drop for this node ({attempts} tried)")]
    NoDropForMe { attempts: usize },
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("contacts error: {0}")]
    Contacts(#[from] ContactsError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("seal error: {0}")]
    Asym(#[from] AsymError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
}

/// The subscriber-handshake surface
#[derive(Clone)]
pub struct Subscribers {
    fs: ProfileFs,
    contacts: Contacts,
    identity: Arc<dyn NodeIdentity>,
}

impl Subscribers {
    pub fn new(fs: ProfileFs, contacts: Contacts, identity: Arc<dyn NodeIdentity>) -> Self {
        Self {
            fs,
            contacts,
            identity,
        }
    }

    /// Subscribe to a peer, establishing (or reusing) the pairwise secret
    ///
    /// Accepts the peer's public key in any recognized encoding. The
    /// pairwise secret is persisted in contacts under the canonical key
    /// before the drop is written; both writes are awaited before return.
    /// Re-running with the same peer rewrites the identical drop in
    /// place.
    pub async fn add_subscriber(&self, peer_key: &[u8]) -> Result<Secret, HandshakeError> {
        let peer = CanonicalKey::normalize(peer_key)?;

        // Reuse the existing pairwise secret, or mint and persist one
        let existing = self
            .contacts
            .get(&peer)
            .await?
            .and_then(|record| record.pairwise_secret());
        let secret = match existing {
            Some(secret) => secret?,
            None => {
                let secret = Secret::generate();
                self.contacts
                    .upsert(
                        &peer,
                        ContactRecord {
                            my_secret: Some(secret.to_b64url()),
                            ..Default::default()
                        },
                    )
                    .await?;
                secret
            }
        };

        let plaintext = format!(
            "{}{}{}{}",
            HELLO_PREFIX,
            peer.as_str(),
            SECRET_SEPARATOR,
            secret.to_b64url()
        );

        let sealed = asym::encrypt(&peer.to_rsa()?, plaintext.as_bytes())?;
        let name = multihash_b58(&[plaintext.as_bytes()]);
        let path = Path::new(SUBSCRIBERS_DIR).join(&name);
        self.fs.write(&path, &sealed).await?;

        tracing::info!(peer = %peer.fingerprint(), drop = %name, "subscriber drop written");
        Ok(secret)
    }

    /// Find the pairwise secret a peer chose for this node
    ///
    /// Lists the peer's drop folder and trial-decrypts every entry with
    /// this node's private key, racing the trials; losing attempts are
    /// ignored. Fails with [`HandshakeError::NoDropForMe`] when no entry
    /// both opens and carries the `Hello ` marker.
    pub async fn test_decrypt_all_subscribers(
        &self,
        peer_subscribers: &Path,
    ) -> Result<Secret, HandshakeError> {
        let keys = self.identity.keypair().await?;
        let entries = self.fs.ls(peer_subscribers).await?;
        let attempts = entries.len();

        let trials = entries.into_iter().map(|entry| {
            let path = peer_subscribers.join(&entry.name);
            self.try_open_drop(path, &keys.private)
        });

        match race_ok(trials).await {
            Ok(secret) => Ok(secret),
            Err(failures) => {
                tracing::debug!(attempts, failures = failures.len(), "no drop matched");
                Err(HandshakeError::NoDropForMe { attempts })
            }
        }
    }

    async fn try_open_drop(
        &self,
        path: PathBuf,
        private: &rsa::RsaPrivateKey,
    ) -> Result<Secret, HandshakeError> {
        let sealed = self.fs.read(&path).await?;
        let plaintext = asym::decrypt(private, &sealed)?;
        parse_drop(&plaintext)
    }
}

/// Extract the pairwise secret from a drop plaintext
///
/// The drop is authenticated by its `Hello ` marker; the secret is the
/// base64url tail after the last ` : ` (the canonical key itself never
/// contains that separator).
fn parse_drop(plaintext: &[u8]) -> Result<Secret, HandshakeError> {
    let text = std::str::from_utf8(plaintext)
        .map_err(|_| HandshakeError::NoDropForMe { attempts: 1 })?;
    if !text.starts_with(HELLO_PREFIX) {
        return Err(HandshakeError::NoDropForMe { attempts: 1 });
    }
    let (_, tail) = text
        .rsplit_once(SECRET_SEPARATOR)
        .ok_or(HandshakeError::NoDropForMe { attempts: 1 })?;
    let bytes = codec::b64url_decode(tail.trim_end())?;
    Ok(Secret::from_slice(&bytes)?)
}
