//! Telegram transport for mention-bot.
//!
//! This module drives a long-polling dispatcher on `teloxide`:
//! - Text messages feed the membership tracker
//! - Join and leave events update the member tables
//! - Messages containing the trigger phrase start a mention broadcast
//!
//! Inbound users are converted to transport-agnostic [`UserProfile`]s at this
//! boundary; the interaction handlers never see Telegram types.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
    Bot,
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    payloads::SendMessageSetters,
    requests::Requester,
    types::{ChatId, Message, ParseMode, Update, User},
};
use tracing::{debug, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, UserProfile, Void},
    },
    interaction,
    service::store::KvClient,
};

use super::{ChatClient, GenericChatClient};

/// Phrase that triggers a mention broadcast, matched case-insensitively
/// anywhere in the message text.
const MENTION_TRIGGER: &str = "@all";

// Extra methods on `ChatClient` applied by the telegram implementation.

impl ChatClient {
    /// Creates a new Telegram chat client.
    pub async fn telegram(config: &Config, store: KvClient) -> Res<Self> {
        let client = TelegramChatClient::new(config, store).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<TelegramChatClient> for ChatClient {
    fn from(client: TelegramChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the dispatcher endpoints.
struct TelegramUserState {
    store: KvClient,
    chat: ChatClient,
}

/// Telegram client implementation.
#[derive(Clone)]
struct TelegramChatClient {
    bot: Bot,
    store: KvClient,
}

impl TelegramChatClient {
    /// Create a new Telegram chat client.
    #[instrument(name = "TelegramChatClient::new", skip_all)]
    pub async fn new(config: &Config, store: KvClient) -> Res<Self> {
        let bot = Bot::new(config.telegram_bot_token.clone());

        // Verify the token by fetching the bot's own identity.
        let me = bot.get_me().await?;

        info!("Telegram bot user: @{} ({}).", me.username(), me.id);

        Ok(Self { bot, store })
    }
}

#[async_trait]
impl GenericChatClient for TelegramChatClient {
    async fn start(&self) -> Void {
        let state = Arc::new(TelegramUserState {
            store: self.store.clone(),
            chat: ChatClient::from(self.clone()),
        });

        // Branch order matters: a trigger message is answered with a
        // broadcast and is not fed to the membership tracker.
        let handler = Update::filter_message()
            .branch(dptree::filter(|msg: Message| has_mention_trigger(&msg)).endpoint(handle_mention_message))
            .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text_message))
            .branch(dptree::filter(|msg: Message| msg.new_chat_members().is_some()).endpoint(handle_new_members))
            .branch(dptree::filter(|msg: Message| msg.left_chat_member().is_some()).endpoint(handle_left_member));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![state])
            .default_handler(|update| async move {
                debug!("Unhandled update: {:?}", update);
            })
            .error_handler(LoggingErrorHandler::with_custom_text("Error in update handler"))
            .build();

        // Stop the dispatcher when the process receives a termination signal.
        let token = dispatcher.shutdown_token();
        tokio::spawn(async move {
            termination_signal().await;

            info!("Shutting down dispatcher ...");

            if let Ok(done) = token.shutdown() {
                done.await;
            }
        });

        info!("Listening for Telegram updates ...");

        dispatcher.dispatch().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_markdown(&self, chat_id: i64, text: &str) -> Void {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Markdown)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }
}

// Dispatcher endpoints.

/// Answers a trigger message with a mention broadcast.
async fn handle_mention_message(msg: Message, state: Arc<TelegramUserState>) -> Void {
    info!("Mention trigger in chat {}.", msg.chat.id);

    interaction::mention::handle_mention_broadcast(msg.chat.id.0, state.store.clone(), state.chat.clone());

    Ok(())
}

/// Records the sender of an ordinary text message.
async fn handle_text_message(msg: Message, state: Arc<TelegramUserState>) -> Void {
    if let Some(user) = &msg.from {
        interaction::membership::handle_member_seen(profile_of(user), msg.chat.id.0, state.store.clone());
    }

    Ok(())
}

/// Records users joining the chat.
async fn handle_new_members(msg: Message, state: Arc<TelegramUserState>) -> Void {
    for user in msg.new_chat_members().unwrap_or_default() {
        interaction::membership::handle_member_seen(profile_of(user), msg.chat.id.0, state.store.clone());
    }

    Ok(())
}

/// Handles a user leaving the chat.
async fn handle_left_member(msg: Message, state: Arc<TelegramUserState>) -> Void {
    if let Some(user) = msg.left_chat_member() {
        interaction::departure::handle_member_left(profile_of(user), msg.chat.id.0, state.store.clone());
    }

    Ok(())
}

// Helpers.

/// True when the message text contains the broadcast trigger phrase.
fn has_mention_trigger(msg: &Message) -> bool {
    msg.text().is_some_and(contains_trigger)
}

/// Case-insensitive, match-anywhere check for the trigger phrase.
fn contains_trigger(text: &str) -> bool {
    text.to_lowercase().contains(MENTION_TRIGGER)
}

/// Converts a Telegram user into the transport-agnostic profile.
fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.0 as i64,
        is_bot: user.is_bot,
        first_name: Some(user.first_name.clone()).filter(|name| !name.is_empty()),
        username: user.username.clone(),
    }
}

/// Resolves when the process receives SIGINT or SIGTERM.
#[cfg(unix)]
async fn termination_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(mut interrupt), Ok(mut terminate)) => {
            tokio::select! {
                _ = interrupt.recv() => info!("SIGINT received."),
                _ = terminate.recv() => info!("SIGTERM received."),
            }
        }
        // Signal registration failed; ctrl-c still covers the common case.
        _ => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn termination_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// Tests.
