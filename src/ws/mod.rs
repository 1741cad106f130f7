//! WebSocket Module - Gestione WebSocket per comunicazione real-time
//!
//! Il WebSocket trasporta verso il client gli eventi del relay (`user:{id}` e
//! `chat:{id}`), raggruppati in batch. Dal client arrivano solo frame di presenza.

pub mod chatmap;
pub mod connection;
pub mod event_handlers;
pub mod presence;
pub mod relay;
pub mod usermap;

// Re-exports pubblici
pub use connection::handle_socket;
pub use presence::PresenceTracker;
pub use relay::EventRelay;

use crate::{AppState, entities::User};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Capacità dei canali broadcast per chat
pub const BROADCAST_CHANNEL_CAPACITY: usize = 100;
/// Numero massimo di eventi per batch
pub const BATCH_MAX_SIZE: usize = 10;
/// Intervallo di flush del batch in millisecondi
pub const BATCH_INTERVAL: u64 = 100;
/// Intervallo minimo tra due frame letti dal client
pub const RATE_LIMITER_MILLIS: u64 = 10;
/// Chiusura della connessione dopo questo tempo senza frame dal client
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Entry point per gestire richieste di upgrade WebSocket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione JWT
) -> Response {
    let user_id = current_user.user_id;
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}
