use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use crate::dtos::RelayEnvelope;

/// Segnali verso il task di scrittura del WebSocket di un utente
#[derive(Debug)]
pub enum InternalSignal {
    Shutdown,
    AddChat(i64),
    RemoveChat(i64),
    Event(Arc<RelayEnvelope>),
}

impl InternalSignal {
    fn kind(&self) -> &'static str {
        match self {
            InternalSignal::Shutdown => "Shutdown",
            InternalSignal::AddChat(_) => "AddChat",
            InternalSignal::RemoveChat(_) => "RemoveChat",
            InternalSignal::Event(_) => "Event",
        }
    }
}

pub struct UserMap {
    users_online: DashMap<i64, UnboundedSender<InternalSignal>>,
}

impl Default for UserMap {
    fn default() -> Self {
        Self::new()
    }
}

impl UserMap {
    pub fn new() -> Self {
        UserMap {
            users_online: DashMap::new(),
        }
    }

    /// A new socket for the same user replaces the previous one
    #[instrument(skip(self, tx))]
    pub fn register_online(&self, user_id: i64, tx: UnboundedSender<InternalSignal>) {
        info!("Registering user {} as online", user_id);
        if let Some(previous) = self.users_online.insert(user_id, tx) {
            let _ = previous.send(InternalSignal::Shutdown);
        }
        debug!("Total online users: {}", self.users_online.len());
    }

    /// Remove the entry only if it still belongs to `tx`, so a socket closing late
    /// does not unregister the connection that replaced it
    #[instrument(skip(self, tx))]
    pub fn remove_if_same(&self, user_id: i64, tx: &UnboundedSender<InternalSignal>) {
        let removed = self
            .users_online
            .remove_if(&user_id, |_, current| current.same_channel(tx));
        if removed.is_some() {
            info!("Removed user from online");
        }
    }

    /// Returns true if the signal reached an open channel
    #[instrument(skip(self, message), fields(kind = message.kind()))]
    pub fn send_server_message_if_online(&self, user_id: i64, message: InternalSignal) -> bool {
        let kind = message.kind();
        match self.users_online.get(&user_id) {
            Some(entry) => match entry.value().send(message) {
                Ok(()) => {
                    debug!("{} signal sent to online user", kind);
                    true
                }
                Err(e) => {
                    warn!("Failed to send {} signal to user: {:?}", kind, e.0.kind());
                    false
                }
            },
            None => {
                debug!("User {} not online, {} signal dropped", user_id, kind);
                false
            }
        }
    }

    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    pub fn is_user_online(&self, user_id: i64) -> bool {
        self.users_online.contains_key(&user_id)
    }
}
