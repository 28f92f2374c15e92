//! Event handling for chat membership and mention broadcasts.
//!
//! This module provides the handlers invoked by the chat transport:
//! - Recording senders and joiners into the per-chat member tables
//! - Removing members when they leave
//! - Expanding the "@all" trigger into a mention broadcast
//!
//! Handlers spawn their work and log failures; nothing here returns errors to
//! the transport. All state flows through the store client.

pub mod departure;
pub mod membership;
pub mod mention;

/// Namespace of the per-chat member info table.
pub(crate) fn info_namespace(chat_id: i64) -> String {
    format!("{chat_id}/members/info")
}

/// Namespace of the per-chat member id list.
pub(crate) fn list_namespace(chat_id: i64) -> String {
    format!("{chat_id}/members/list")
}
