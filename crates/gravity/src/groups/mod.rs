//! Group engine
//!
//! A group bundles a set of subscribed peers under a single symmetric
//! group key. On creation the key is delivered to every member by
//! encrypting it under that member's pairwise secret, and to the creator
//! under the master key. The group is named by a random salt; members
//! find their own delivery file at a name derived from the salt and
//! their pairwise secret, so the directory listing links nobody across
//! groups.
//!
//! # Directory Layout
//!
//! ```text
//! /groups/<b64url(salt)>/me             group key under the master key
//! /groups/<b64url(salt)>/<b58 name>     group key under a member's pairwise secret
//! /groups/<b64url(salt)>/info.json.enc  group info under the group key
//! ```
//!
//! The delivery payload is always the canonical single-element JSON list
//! `[ b64url(group key) ]`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contacts::{Contacts, ContactsError};
use crate::crypto::codec::{self, CodecError};
use crate::crypto::hash::multihash_b58;
use crate::crypto::{Secret, SecretError, NONCE_SIZE};
use crate::fs::{FsError, ProfileFs};
use crate::identity::{CanonicalKey, KeyError, NodeIdentity};
use crate::keystore::{KeystoreError, MasterKeyStore};

/// The groups folder in the profile tree
pub const GROUPS_DIR: &str = "/groups";
/// The creator's own delivery entry
pub const SELF_ENTRY: &str = "me";
/// The encrypted group-info record
pub const INFO_FILE: &str = "info.json.enc";

/// Errors that can occur in the group engine
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// `create_group` was given peers that are not in contacts; nothing
    /// was written.
    #[error("unknown members: {}", fingerprints(.0))]
    UnknownMember(Vec<CanonicalKey>),
    /// `set_nicknames` was given peers without a delivery file in the
    /// group directory; nothing was written.
    #[error("not in group: {}", fingerprints(.0))]
    NotInGroup(Vec<CanonicalKey>),
    #[error("group record is malformed: {0}")]
    Malformed(anyhow::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("keystore error: {0}")]
    Keystore(#[from] KeystoreError),
    #[error("contacts error: {0}")]
    Contacts(#[from] ContactsError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error("group error: {0}")]
    Default(#[from] anyhow::Error),
}

fn fingerprints(keys: &[CanonicalKey]) -> String {
    keys.iter()
        .map(|k| k.fingerprint())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shared metadata of one group
///
/// `members` maps each member's canonical key (the creator included) to a
/// human-chosen nickname, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub members: BTreeMap<CanonicalKey, String>,
}

/// The group-engine surface
#[derive(Clone)]
pub struct Groups {
    fs: ProfileFs,
    master: MasterKeyStore,
    contacts: Contacts,
    identity: Arc<dyn NodeIdentity>,
}

impl Groups {
    pub fn new(
        fs: ProfileFs,
        master: MasterKeyStore,
        contacts: Contacts,
        identity: Arc<dyn NodeIdentity>,
    ) -> Self {
        Self {
            fs,
            master,
            contacts,
            identity,
        }
    }

    /// The delivery filename for a member: Base58 multihash of salt ‖ secret
    ///
    /// Deterministic, so the member can find their entry without probing,
    /// and unlinkable across groups because the salt differs.
    pub fn member_filename(salt: &[u8], pairwise: &Secret) -> String {
        multihash_b58(&[salt, pairwise.bytes()])
    }

    fn group_dir(group: &str) -> PathBuf {
        Path::new(GROUPS_DIR).join(group)
    }

    /// Create a group over the given members, returning its directory name
    ///
    /// Every member must already be in contacts with a pairwise secret;
    /// otherwise the call fails with [`GroupError::UnknownMember`] naming
    /// all missing peers, and nothing is written. Key deliveries and the
    /// info record are written in parallel and awaited; the membership
    /// roster is then seeded with empty nicknames, strictly afterwards.
    pub async fn create_group(
        &self,
        members: &[CanonicalKey],
        group_id: Option<&str>,
    ) -> Result<String, GroupError> {
        // Resolve every member's pairwise secret up front; reject the
        // whole call before any write if one is missing
        let contacts = self.contacts.all().await?;
        let mut missing = Vec::new();
        let mut pairwise = Vec::new();
        for member in members {
            match contacts
                .get(member)
                .and_then(|record| record.pairwise_secret())
            {
                Some(secret) => pairwise.push((member, secret?)),
                None => missing.push(member.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(GroupError::UnknownMember(missing));
        }

        // The salt names the group; the group key seals its metadata
        let mut salt = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut salt).map_err(|e| anyhow::anyhow!("salt generation: {}", e))?;
        let group_key = Secret::generate();
        let group = codec::b64url_encode(&salt);
        let dir = Self::group_dir(&group);

        self.fs.mkdir_all(&dir).await?;

        let delivery = serde_json::to_vec(&[group_key.to_b64url()])
            .map_err(|e| GroupError::Malformed(e.into()))?;
        let master = self.master.get().await?;
        let id = group_id
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let info = serde_json::to_vec(&serde_json::json!({ "id": id }))
            .map_err(|e| GroupError::Malformed(e.into()))?;

        // Member deliveries, the creator's entry, and the info record can
        // land in any order relative to each other
        let mut writes = Vec::new();
        for (member, secret) in &pairwise {
            let name = Self::member_filename(&salt, secret);
            tracing::debug!(group = %group, peer = %member.fingerprint(), entry = %name, "delivering group key");
            writes.push((dir.join(name), secret.encrypt(&delivery)?));
        }
        writes.push((dir.join(SELF_ENTRY), master.encrypt(&delivery)?));
        writes.push((dir.join(INFO_FILE), group_key.encrypt(&info)?));

        futures::future::try_join_all(
            writes
                .iter()
                .map(|(path, blob)| self.fs.write(path, blob)),
        )
        .await?;

        // The roster seeding must observe the info record, so it is
        // strictly ordered after the writes above
        let mut names: BTreeMap<CanonicalKey, String> = BTreeMap::new();
        names.insert(self.identity.keypair().await?.canonical()?, String::new());
        for member in members {
            names.insert(member.clone(), String::new());
        }
        self.set_nicknames(&names, &group).await?;

        tracing::info!(group = %group, id = %id, members = members.len(), "group created");
        Ok(group)
    }

    /// Read this participant's own copy of the group key
    pub async fn get_group_key(&self, group: &str) -> Result<Secret, GroupError> {
        let master = self.master.get().await?;
        let blob = self.fs.read(Self::group_dir(group).join(SELF_ENTRY)).await?;
        let plain = master.decrypt(&blob)?;

        let list: Vec<String> =
            serde_json::from_slice(&plain).map_err(|e| GroupError::Malformed(e.into()))?;
        let first = list
            .first()
            .ok_or_else(|| GroupError::Malformed(anyhow::anyhow!("empty key delivery list")))?;
        Ok(Secret::from_b64url(first)?)
    }

    /// Read the group's shared metadata; a missing record reads as empty
    pub async fn get_group_info(&self, group: &str) -> Result<GroupInfo, GroupError> {
        let group_key = self.get_group_key(group).await?;
        let blob = match self
            .fs
            .read_opt(Self::group_dir(group).join(INFO_FILE))
            .await?
        {
            Some(blob) => blob,
            None => return Ok(GroupInfo::default()),
        };
        let plain = group_key.decrypt(&blob)?;
        serde_json::from_slice(&plain).map_err(|e| GroupError::Malformed(e.into()))
    }

    /// Merge nicknames into the group's membership roster
    ///
    /// Every named peer must be present in the group: the participant
    /// through the `me` entry, everyone else through their derived
    /// delivery filename. Absent peers fail the whole call with
    /// [`GroupError::NotInGroup`] naming all of them, and nothing is
    /// written.
    pub async fn set_nicknames(
        &self,
        names: &BTreeMap<CanonicalKey, String>,
        group: &str,
    ) -> Result<(), GroupError> {
        let dir = Self::group_dir(group);
        let present: Vec<String> = self
            .fs
            .ls(&dir)
            .await?
            .into_iter()
            .map(|entry| entry.name)
            .collect();

        let salt = codec::b64url_decode(group)?;
        let own = self.identity.keypair().await?.canonical()?;
        let contacts = self.contacts.all().await?;

        let mut missing = Vec::new();
        for member in names.keys() {
            if *member == own {
                if !present.iter().any(|name| name == SELF_ENTRY) {
                    missing.push(member.clone());
                }
                continue;
            }
            let secret = match contacts
                .get(member)
                .and_then(|record| record.pairwise_secret())
            {
                Some(secret) => secret?,
                None => {
                    missing.push(member.clone());
                    continue;
                }
            };
            let expected = Self::member_filename(&salt, &secret);
            if !present.iter().any(|name| *name == expected) {
                missing.push(member.clone());
            }
        }
        if !missing.is_empty() {
            return Err(GroupError::NotInGroup(missing));
        }

        let group_key = self.get_group_key(group).await?;
        let mut info = self.get_group_info(group).await?;
        for (member, nickname) in names {
            info.members.insert(member.clone(), nickname.clone());
        }

        let plain = serde_json::to_vec(&info).map_err(|e| GroupError::Malformed(e.into()))?;
        self.fs
            .write(dir.join(INFO_FILE), &group_key.encrypt(&plain)?)
            .await?;
        tracing::debug!(group = %group, named = names.len(), "nicknames written");
        Ok(())
    }

    /// List the groups this profile carries; a missing folder reads as none
    pub async fn list_groups(&self) -> Result<Vec<String>, GroupError> {
        let entries = self.fs.ls_opt(GROUPS_DIR).await?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }
}
