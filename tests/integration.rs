#![cfg(test)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mention_bot::{
    base::types::{MemberRecord, UserProfile, Void},
    interaction,
    service::{
        chat::{ChatClient, GenericChatClient},
        store::KvClient,
    },
};
use mockall::mock;
use tempfile::TempDir;
use tokio::sync::mpsc;

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn start(&self) -> Void;
        async fn send_markdown(&self, chat_id: i64, text: &str) -> Void;
    }
}

/// Chat mock that forwards every broadcast text to a channel.
fn capturing_chat(tx: mpsc::UnboundedSender<String>) -> ChatClient {
    let mut mock = MockChat::new();

    mock.expect_send_markdown().returning(move |_, text| {
        let _ = tx.send(text.to_string());
        Ok(())
    });

    ChatClient::new(Arc::new(mock))
}

// Helpers.

/// Store rooted in a fresh temp directory; the directory handle keeps it alive.
fn temp_store() -> (TempDir, KvClient) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = KvClient::sled_at(dir.path()).expect("Failed to open store");
    (dir, store)
}

fn member(id: i64, first_name: Option<&str>, username: Option<&str>) -> UserProfile {
    UserProfile {
        id,
        is_bot: false,
        first_name: first_name.map(str::to_string),
        username: username.map(str::to_string),
    }
}

fn bot(id: i64) -> UserProfile {
    UserProfile {
        id,
        is_bot: true,
        first_name: Some("Helper".to_string()),
        username: Some("helper_bot".to_string()),
    }
}

async fn member_list(store: &KvClient, chat_id: i64) -> Vec<i64> {
    store
        .fetch_or(&format!("{chat_id}/members/list"), &chat_id.to_string(), Vec::new())
        .await
}

async fn member_record(store: &KvClient, chat_id: i64, member_id: i64) -> MemberRecord {
    store
        .fetch_or(
            &format!("{chat_id}/members/info"),
            &member_id.to_string(),
            MemberRecord::unknown(member_id),
        )
        .await
}

/// Polls the member list until `predicate` holds or the timeout elapses.
///
/// The handlers spawn their work, so tests have to wait for the store to
/// settle rather than awaiting a return value.
async fn wait_for_members(store: &KvClient, chat_id: i64, predicate: impl Fn(&[i64]) -> bool) -> Vec<i64> {
    for _ in 0..200 {
        let members = member_list(store, chat_id).await;
        if predicate(&members) {
            return members;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("Timed out waiting for member list of chat {chat_id} to settle");
}

/// Waits for the next broadcast text sent through the mock chat client.
async fn next_broadcast(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for a broadcast")
        .expect("Broadcast channel closed")
}

// Tests.

#[tokio::test]
async fn test_tracked_member_is_listed_once() {
    let (_dir, store) = temp_store();
    let chat_id = 100;

    // Track the same member twice in a row.
    interaction::membership::handle_member_seen(member(1, Some("Ann"), None), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1]).await;

    interaction::membership::handle_member_seen(member(1, Some("Ann"), None), chat_id, store.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The id appears exactly once, and the record round-trips.
    assert_eq!(member_list(&store, chat_id).await, vec![1]);
    let record = member_record(&store, chat_id, 1).await;
    assert_eq!(record.first_name.as_deref(), Some("Ann"));
}

#[tokio::test]
async fn test_record_is_overwritten_whole() {
    let (_dir, store) = temp_store();
    let chat_id = 100;

    interaction::membership::handle_member_seen(member(1, Some("Ann"), Some("ann_b")), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1]).await;

    // The same member reappears with the username gone; no field merge happens.
    interaction::membership::handle_member_seen(member(1, Some("Annie"), None), chat_id, store.clone());

    for _ in 0..200 {
        let record = member_record(&store, chat_id, 1).await;
        if record.first_name.as_deref() == Some("Annie") {
            assert_eq!(record.username, None);
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("Timed out waiting for the record to be overwritten");
}

#[tokio::test]
async fn test_bots_are_never_tracked() {
    let (_dir, store) = temp_store();
    let chat_id = 100;

    interaction::membership::handle_member_seen(bot(99), chat_id, store.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(member_list(&store, chat_id).await.is_empty());
    assert_eq!(member_record(&store, chat_id, 99).await, MemberRecord::unknown(99));
}

#[tokio::test]
async fn test_broadcast_mentions_members_in_insertion_order() {
    let (_dir, store) = temp_store();
    let chat_id = 100;

    interaction::membership::handle_member_seen(member(1, Some("Ann"), None), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1]).await;
    interaction::membership::handle_member_seen(member(2, None, Some("bob2")), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1, 2]).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    interaction::mention::handle_mention_broadcast(chat_id, store.clone(), capturing_chat(tx));

    assert_eq!(next_broadcast(&mut rx).await, "[Ann](tg://user?id=1), [bob2](tg://user?id=2)");
}

#[tokio::test]
async fn test_departed_member_is_excluded_from_broadcast() {
    let (_dir, store) = temp_store();
    let chat_id = 100;

    interaction::membership::handle_member_seen(member(1, Some("Ann"), None), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1]).await;
    interaction::membership::handle_member_seen(member(2, None, Some("bob2")), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1, 2]).await;

    interaction::departure::handle_member_left(member(2, None, Some("bob2")), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1]).await;

    // The record is gone too, not just the list entry.
    assert_eq!(member_record(&store, chat_id, 2).await, MemberRecord::unknown(2));

    let (tx, mut rx) = mpsc::unbounded_channel();
    interaction::mention::handle_mention_broadcast(chat_id, store.clone(), capturing_chat(tx));

    assert_eq!(next_broadcast(&mut rx).await, "[Ann](tg://user?id=1)");
}

#[tokio::test]
async fn test_departure_of_unknown_member_is_harmless() {
    let (_dir, store) = temp_store();
    let chat_id = 100;

    interaction::membership::handle_member_seen(member(1, Some("Ann"), None), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1]).await;

    // Id 42 was never tracked; the list must come through unchanged.
    interaction::departure::handle_member_left(member(42, None, None), chat_id, store.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(member_list(&store, chat_id).await, vec![1]);
}

#[tokio::test]
async fn test_bot_departure_is_ignored() {
    let (_dir, store) = temp_store();
    let chat_id = 100;

    interaction::membership::handle_member_seen(member(1, Some("Ann"), None), chat_id, store.clone());
    wait_for_members(&store, chat_id, |members| members == [1]).await;

    interaction::departure::handle_member_left(bot(1), chat_id, store.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Same numeric id, but the bot flag means nothing is touched.
    assert_eq!(member_list(&store, chat_id).await, vec![1]);
    assert_eq!(member_record(&store, chat_id, 1).await.first_name.as_deref(), Some("Ann"));
}

#[tokio::test]
async fn test_broadcast_on_empty_chat_is_empty_string() {
    let (_dir, store) = temp_store();

    let (tx, mut rx) = mpsc::unbounded_channel();
    interaction::mention::handle_mention_broadcast(100, store.clone(), capturing_chat(tx));

    assert_eq!(next_broadcast(&mut rx).await, "");
}

#[tokio::test]
async fn test_chats_are_isolated() {
    let (_dir, store) = temp_store();

    interaction::membership::handle_member_seen(member(1, Some("Ann"), None), 100, store.clone());
    wait_for_members(&store, 100, |members| members == [1]).await;

    interaction::membership::handle_member_seen(member(2, None, Some("bob2")), 200, store.clone());
    wait_for_members(&store, 200, |members| members == [2]).await;

    // Each chat only broadcasts its own members.
    let (tx, mut rx) = mpsc::unbounded_channel();
    interaction::mention::handle_mention_broadcast(100, store.clone(), capturing_chat(tx));
    assert_eq!(next_broadcast(&mut rx).await, "[Ann](tg://user?id=1)");

    let (tx, mut rx) = mpsc::unbounded_channel();
    interaction::mention::handle_mention_broadcast(200, store.clone(), capturing_chat(tx));
    assert_eq!(next_broadcast(&mut rx).await, "[bob2](tg://user?id=2)");
}
