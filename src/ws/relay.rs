//! Event relay - Pub/sub in-process sui canali `user:{id}` e `chat:{id}`
//!
//! La pubblicazione non fallisce mai: se nessuno è in ascolto l'evento viene scartato.
//! I client usano gli eventi come segnale per ricaricare lo stato via HTTP.

use crate::dtos::{RelayEnvelope, RelayEvent};
use crate::ws::chatmap::ChatMap;
use crate::ws::usermap::{InternalSignal, UserMap};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Default)]
pub struct EventRelay {
    /// Mappa concorrente degli utenti online con i loro canali WebSocket
    pub users: UserMap,
    /// Canali broadcast delle chat con almeno un utente online
    pub chats: ChatMap,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish on `user:{user_id}`. Returns true if the user had an open socket.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn publish_to_user(&self, user_id: i64, event: RelayEvent) -> bool {
        let envelope = Arc::new(RelayEnvelope::for_user(user_id, event));
        self.users
            .send_server_message_if_online(user_id, InternalSignal::Event(envelope))
    }

    /// Publish on `chat:{chat_id}`. Returns the number of sockets reached.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn publish_to_chat(&self, chat_id: i64, event: RelayEvent) -> usize {
        let envelope = Arc::new(RelayEnvelope::for_chat(chat_id, event));
        let reached = self.chats.send(chat_id, envelope);
        debug!(reached, "Chat event published");
        reached
    }

    /// Subscribe the user's open socket (if any) to a chat it just joined
    pub fn join_chat(&self, user_id: i64, chat_id: i64) {
        self.users
            .send_server_message_if_online(user_id, InternalSignal::AddChat(chat_id));
    }

    pub fn leave_chat(&self, user_id: i64, chat_id: i64) {
        self.users
            .send_server_message_if_online(user_id, InternalSignal::RemoveChat(chat_id));
    }
}
