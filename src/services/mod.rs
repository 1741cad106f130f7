//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod auth;
pub mod chat;
pub mod connection;
pub mod follow;
pub mod message;
pub mod notification;
pub mod user;

// Re-exports per facilitare l'import
pub use auth::{login_user, register_user};
pub use chat::{add_participant, create_chat, leave_chat, list_chats, update_chat_settings};
pub use connection::{
    block_user, create_connection, list_connections, respond_connection, unblock_user,
    withdraw_connection,
};
pub use follow::{follow_user, list_followers, list_following, unfollow_user};
pub use message::{
    delete_message, edit_message, get_chat_messages, mark_chat_as_read, send_message,
    toggle_reaction,
};
pub use notification::{
    delete_notification, get_unread_count, list_notifications, update_notifications,
};
pub use user::{get_user_by_id, ping_presence, search_user_with_username, update_my_privacy};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
