use futures::future::join_all;
use tracing::{Instrument, error, instrument};

use crate::{
    base::types::{MemberRecord, Void},
    service::{chat::ChatClient, store::KvClient},
};

use super::{info_namespace, list_namespace};

/// Expands an "@all" trigger into a mention broadcast.
///
/// This function loads the chat's member list, resolves each id to a display
/// name, and replies with one mention link per member. It spawns a new task
/// to handle the event asynchronously.
#[instrument(skip_all)]
pub fn handle_mention_broadcast(chat_id: i64, store: KvClient, chat: ChatClient) {
    tokio::spawn(async move {
        // Process the event.
        let result = handle_mention_broadcast_internal(chat_id, &store, &chat).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling: {}", err);
        }
    });
}

/// Internal function to handle the broadcast.
///
/// An empty member list produces an empty-string reply; the transport decides
/// what to do with it.
#[instrument(skip_all)]
async fn handle_mention_broadcast_internal(chat_id: i64, store: &KvClient, chat: &ChatClient) -> Void {
    let text = render_broadcast(chat_id, store).await;

    chat.send_markdown(chat_id, &text).await
}

/// Builds the broadcast text: one mention token per member, joined with ", ".
///
/// Record lookups run concurrently; the join preserves the member list's
/// insertion order. Members whose record is missing or unreadable get a
/// placeholder name rather than failing the broadcast.
async fn render_broadcast(chat_id: i64, store: &KvClient) -> String {
    let members: Vec<i64> = store.fetch_or(&list_namespace(chat_id), &chat_id.to_string(), Vec::new()).await;

    let info_ns = info_namespace(chat_id);
    let mentions = join_all(members.iter().map(|&member_id| {
        let info_ns = info_ns.clone();
        let store = store.clone();

        async move {
            let record = store
                .fetch_or(&info_ns, &member_id.to_string(), MemberRecord::unknown(member_id))
                .await;

            mention_token(&record)
        }
    }))
    .await;

    mentions.join(", ")
}

/// Renders the deep-link mention fragment for one member.
fn mention_token(record: &MemberRecord) -> String {
    format!("[{}](tg://user?id={})", record.display_name(), record.member_id)
}

// Tests.
