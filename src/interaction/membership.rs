use tracing::{Instrument, error, instrument};

use crate::{
    base::types::{MemberRecord, UserProfile, Void},
    service::store::KvClient,
};

use super::{info_namespace, list_namespace};

/// Records a member observed on a message or join event.
///
/// This function is responsible for upserting the member's record and adding
/// the id to the chat's member list. It spawns a new task to handle the event
/// asynchronously. Bots are never recorded.
#[instrument(skip_all)]
pub fn handle_member_seen(profile: UserProfile, chat_id: i64, store: KvClient) {
    tokio::spawn(async move {
        // Process the event.
        let result = handle_member_seen_internal(profile, chat_id, &store).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling: {}", err);
        }
    });
}

/// Internal function to handle the member-seen event.
///
/// Repeated invocations with the same identity are idempotent: the record is
/// overwritten with identical contents and the list is left unchanged.
#[instrument(skip_all)]
async fn handle_member_seen_internal(profile: UserProfile, chat_id: i64, store: &KvClient) -> Void {
    if profile.is_bot {
        return Ok(());
    }

    // The record goes first so every listed id has one.
    let record = MemberRecord::from(&profile);
    store.put(&info_namespace(chat_id), &record.member_id.to_string(), &record).await?;

    let list_ns = list_namespace(chat_id);
    let key = chat_id.to_string();

    let mut members: Vec<i64> = store.fetch_or(&list_ns, &key, Vec::new()).await;

    if !members.contains(&profile.id) {
        members.push(profile.id);
        store.put(&list_ns, &key, &members).await?;
    }

    Ok(())
}
