//! Integration tests for the group engine

use std::collections::BTreeMap;
use std::path::Path;

use gravity::crypto::codec::b64url_decode;
use gravity::fs::ProfileStore;
use gravity::groups::{GroupError, Groups, GROUPS_DIR, INFO_FILE, SELF_ENTRY};
use gravity::testkit::TestParticipant;

async fn subscribed_pair() -> (TestParticipant, TestParticipant) {
    let alice = TestParticipant::new("alice").await;
    let bob = TestParticipant::new("bob").await;
    alice
        .gravity()
        .add_subscriber(bob.canonical_key().as_str().as_bytes())
        .await
        .unwrap();
    (alice, bob)
}

#[tokio::test]
async fn test_group_of_two_layout() {
    let (alice, bob) = subscribed_pair().await;

    let group = alice
        .gravity()
        .create_group(&[bob.canonical_key()], Some("g1"))
        .await
        .unwrap();

    // The pairwise secret Alice holds for Bob determines Bob's entry name
    let contacts = alice.gravity().get_contacts().await.unwrap();
    let pairwise = contacts[&bob.canonical_key()]
        .pairwise_secret()
        .unwrap()
        .unwrap();
    let salt = b64url_decode(&group).unwrap();
    let member_entry = Groups::member_filename(&salt, &pairwise);

    let tree = alice
        .gravity()
        .load_tree(Path::new(GROUPS_DIR).join(&group))
        .await
        .unwrap();
    let entries = tree.children.unwrap();
    let mut names: Vec<&str> = entries.keys().map(String::as_str).collect();
    names.sort();
    let mut expected = vec![SELF_ENTRY, INFO_FILE, member_entry.as_str()];
    expected.sort();
    assert_eq!(names, expected);

    // Info carries the chosen id and both members with empty nicknames
    let info = alice.gravity().get_group_info(&group).await.unwrap();
    assert_eq!(info.id, "g1");
    assert_eq!(info.members.len(), 2);
    assert_eq!(info.members[&alice.canonical_key()], "");
    assert_eq!(info.members[&bob.canonical_key()], "");
}

#[tokio::test]
async fn test_member_can_open_their_delivery() {
    let (alice, bob) = subscribed_pair().await;

    // Bob learns the pairwise secret from Alice's drop folder
    bob.link_peer("/peers/alice", &alice);
    let pairwise = bob
        .gravity()
        .test_decrypt_all_subscribers(Path::new("/peers/alice/subscribers"))
        .await
        .unwrap();

    let group = alice
        .gravity()
        .create_group(&[bob.canonical_key()], None)
        .await
        .unwrap();

    // Bob derives his entry name, reads it from Alice's tree, and
    // recovers the same group key Alice holds
    let salt = b64url_decode(&group).unwrap();
    let entry = Groups::member_filename(&salt, &pairwise);
    let sealed = bob
        .store()
        .read(
            &Path::new("/peers/alice")
                .join(GROUPS_DIR.trim_start_matches('/'))
                .join(&group)
                .join(&entry),
        )
        .await
        .unwrap();

    let delivery: Vec<String> =
        serde_json::from_slice(&pairwise.decrypt(&sealed).unwrap()).unwrap();
    let group_key = gravity::crypto::Secret::from_b64url(&delivery[0]).unwrap();
    assert_eq!(group_key, alice.gravity().get_group_key(&group).await.unwrap());
}

#[tokio::test]
async fn test_unknown_member_writes_nothing() {
    let alice = TestParticipant::new("alice").await;
    let carol = TestParticipant::new("carol").await;

    let result = alice
        .gravity()
        .create_group(&[carol.canonical_key()], None)
        .await;
    match result {
        Err(GroupError::UnknownMember(missing)) => {
            assert_eq!(missing, vec![carol.canonical_key()]);
        }
        other => panic!("expected UnknownMember, got {:?}", other.map(|_| ())),
    }

    // The groups folder was never touched
    assert!(alice.gravity().list_groups().await.unwrap().is_empty());
    let stat = alice.store().stat(Path::new(GROUPS_DIR)).await;
    assert!(stat.unwrap_err().is_missing());
}

#[tokio::test]
async fn test_fresh_id_when_none_given() {
    let (alice, bob) = subscribed_pair().await;
    let group = alice
        .gravity()
        .create_group(&[bob.canonical_key()], None)
        .await
        .unwrap();

    let info = alice.gravity().get_group_info(&group).await.unwrap();
    assert!(uuid::Uuid::parse_str(&info.id).is_ok());
}

#[tokio::test]
async fn test_nickname_update_merges() {
    let (alice, bob) = subscribed_pair().await;
    let group = alice
        .gravity()
        .create_group(&[bob.canonical_key()], Some("g1"))
        .await
        .unwrap();

    let mut names = BTreeMap::new();
    names.insert(bob.canonical_key(), "bobby".to_string());
    alice.gravity().set_nicknames(&names, &group).await.unwrap();

    let info = alice.gravity().get_group_info(&group).await.unwrap();
    assert_eq!(info.id, "g1");
    assert_eq!(info.members[&bob.canonical_key()], "bobby");
    // Untouched members keep their nicknames
    assert_eq!(info.members[&alice.canonical_key()], "");
}

#[tokio::test]
async fn test_nicknames_reject_absent_members_atomically() {
    let (alice, bob) = subscribed_pair().await;
    let carol = TestParticipant::new("carol").await;
    let dan = TestParticipant::new("dan").await;

    // Dan is subscribed but not in the group; Carol is a stranger
    alice
        .gravity()
        .add_subscriber(dan.canonical_key().as_str().as_bytes())
        .await
        .unwrap();

    let group = alice
        .gravity()
        .create_group(&[bob.canonical_key()], None)
        .await
        .unwrap();

    let mut names = BTreeMap::new();
    names.insert(bob.canonical_key(), "bobby".to_string());
    names.insert(carol.canonical_key(), "carol".to_string());
    names.insert(dan.canonical_key(), "dan".to_string());

    let result = alice.gravity().set_nicknames(&names, &group).await;
    match result {
        Err(GroupError::NotInGroup(mut missing)) => {
            missing.sort();
            let mut expected = vec![carol.canonical_key(), dan.canonical_key()];
            expected.sort();
            assert_eq!(missing, expected);
        }
        other => panic!("expected NotInGroup, got {:?}", other.map(|_| ())),
    }

    // The rejected call left the roster untouched
    let info = alice.gravity().get_group_info(&group).await.unwrap();
    assert_eq!(info.members[&bob.canonical_key()], "");
    assert!(!info.members.contains_key(&carol.canonical_key()));
}

#[tokio::test]
async fn test_list_groups() {
    let (alice, bob) = subscribed_pair().await;
    assert!(alice.gravity().list_groups().await.unwrap().is_empty());

    let g1 = alice
        .gravity()
        .create_group(&[bob.canonical_key()], None)
        .await
        .unwrap();
    let g2 = alice
        .gravity()
        .create_group(&[bob.canonical_key()], None)
        .await
        .unwrap();

    let mut listed = alice.gravity().list_groups().await.unwrap();
    listed.sort();
    let mut expected = vec![g1, g2];
    expected.sort();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_missing_info_reads_as_empty() {
    let (alice, bob) = subscribed_pair().await;
    let group = alice
        .gravity()
        .create_group(&[bob.canonical_key()], Some("g1"))
        .await
        .unwrap();

    alice
        .store()
        .rm(&Path::new(GROUPS_DIR).join(&group).join(INFO_FILE), false)
        .await
        .unwrap();

    let info = alice.gravity().get_group_info(&group).await.unwrap();
    assert_eq!(info, Default::default());
}
