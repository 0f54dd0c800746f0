//! Integration tests for the subscriber handshake

use std::path::Path;
use std::sync::Arc;

use gravity::crypto::hash::multihash_b58;
use gravity::gravity::Gravity;
use gravity::keystore::KeystoreError;
use gravity::subscribers::{HandshakeError, SUBSCRIBERS_DIR};
use gravity::testkit::{MemoryKeyStore, MemoryProfileStore, TestIdentity, TestParticipant};

#[tokio::test]
async fn test_handshake_recovers_pairwise_secret() {
    let alice = TestParticipant::new("alice").await;
    let bob = TestParticipant::new("bob").await;

    // Alice subscribes to Bob
    let secret = alice
        .gravity()
        .add_subscriber(bob.canonical_key().as_str().as_bytes())
        .await
        .unwrap();

    // Bob walks Alice's published subscribers folder
    bob.link_peer("/peers/alice", &alice);
    let recovered = bob
        .gravity()
        .test_decrypt_all_subscribers(Path::new("/peers/alice/subscribers"))
        .await
        .unwrap();
    assert_eq!(recovered, secret);

    // The same bytes are on record in Alice's contacts under Bob's key
    let contacts = alice.gravity().get_contacts().await.unwrap();
    let record = contacts.get(&bob.canonical_key()).unwrap();
    assert_eq!(record.my_secret.as_deref(), Some(secret.to_b64url().as_str()));
}

#[tokio::test]
async fn test_handshake_accepts_framed_key() {
    let alice = TestParticipant::new("alice").await;
    let bob = TestParticipant::new("bob").await;

    // Subscribing with the protobuf frame lands on the canonical key
    alice
        .gravity()
        .add_subscriber(&bob.identity().framed_key())
        .await
        .unwrap();

    let contacts = alice.gravity().get_contacts().await.unwrap();
    assert!(contacts.contains_key(&bob.canonical_key()));
}

#[tokio::test]
async fn test_resubscribe_is_idempotent() {
    let alice = TestParticipant::new("alice").await;
    let bob = TestParticipant::new("bob").await;
    let peer_key = bob.canonical_key();

    let first = alice
        .gravity()
        .add_subscriber(peer_key.as_str().as_bytes())
        .await
        .unwrap();
    let second = alice
        .gravity()
        .add_subscriber(peer_key.as_str().as_bytes())
        .await
        .unwrap();
    assert_eq!(first, second);

    // Exactly one drop, at the name derived from the plaintext
    let tree = alice.gravity().load_tree(SUBSCRIBERS_DIR).await.unwrap();
    let drops = tree.children.unwrap();
    assert_eq!(drops.len(), 1);

    let plaintext = format!("Hello {} : {}", peer_key.as_str(), first.to_b64url());
    let expected = multihash_b58(&[plaintext.as_bytes()]);
    assert!(drops.contains_key(&expected));
}

#[tokio::test]
async fn test_no_drop_for_unrelated_peer() {
    let alice = TestParticipant::new("alice").await;
    let bob = TestParticipant::new("bob").await;
    let carol = TestParticipant::new("carol").await;

    // Alice only subscribes to Bob
    alice
        .gravity()
        .add_subscriber(bob.canonical_key().as_str().as_bytes())
        .await
        .unwrap();

    // Carol finds no drop that opens for her
    carol.link_peer("/peers/alice", &alice);
    let result = carol
        .gravity()
        .test_decrypt_all_subscribers(Path::new("/peers/alice/subscribers"))
        .await;
    assert!(matches!(
        result,
        Err(HandshakeError::NoDropForMe { attempts: 1 })
    ));
}

#[tokio::test]
async fn test_operations_require_master_key() {
    // A participant that never ran reset_master_key
    let gravity = Gravity::builder()
        .profile_store(Arc::new(MemoryProfileStore::new()))
        .key_value_store(Arc::new(MemoryKeyStore::new()))
        .identity(Arc::new(TestIdentity::generate()))
        .build()
        .unwrap();

    assert!(matches!(
        gravity.get_master_key().await,
        Err(KeystoreError::NoMasterKey)
    ));
}
