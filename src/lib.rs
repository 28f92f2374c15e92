//! Library root for `mention-bot`.
//!
//! Mention-bot is a Telegram group assistant that:
//! - Tracks chat membership from observed messages and join events
//! - Forgets members when they leave the chat
//! - Expands "@all" into a broadcast that mentions every known member
//!
//! The bot integrates with Telegram for chat and sled for storage.
//! The architecture is built around extensible traits that allow for
//! different implementations of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the mention-bot runtime:
/// - Creates the runtime context with store and chat clients
/// - Starts the main event loop for processing updates
pub async fn start(config: Config) -> Void {
    info!("Starting mention-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
