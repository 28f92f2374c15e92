use tracing::{Instrument, error, info, instrument};

use crate::{
    base::types::{UserProfile, Void},
    service::store::KvClient,
};

use super::{info_namespace, list_namespace};

/// Handles a member leaving the chat.
///
/// This function drops the member's record and filters the id out of the
/// chat's member list. It spawns a new task to handle the event
/// asynchronously. Departures of bots are ignored.
#[instrument(skip_all)]
pub fn handle_member_left(profile: UserProfile, chat_id: i64, store: KvClient) {
    tokio::spawn(async move {
        // Process the event.
        let result = handle_member_left_internal(profile, chat_id, &store).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling: {}", err);
        }
    });
}

/// Internal function to handle the departure event.
#[instrument(skip_all)]
async fn handle_member_left_internal(profile: UserProfile, chat_id: i64, store: &KvClient) -> Void {
    if profile.is_bot {
        return Ok(());
    }

    info!(
        member_id = profile.id,
        first_name = profile.first_name.as_deref(),
        username = profile.username.as_deref(),
        chat_id,
        "Member left."
    );

    let list_ns = list_namespace(chat_id);
    let key = chat_id.to_string();

    let members: Vec<i64> = store.fetch_or(&list_ns, &key, Vec::new()).await;

    store.delete(&info_namespace(chat_id), &profile.id.to_string()).await?;

    // Ids that were never listed fall through as a no-op rewrite.
    let remaining: Vec<i64> = members.into_iter().filter(|id| *id != profile.id).collect();
    store.put(&list_ns, &key, &remaining).await?;

    Ok(())
}
