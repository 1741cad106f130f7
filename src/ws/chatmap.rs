use crate::dtos::RelayEnvelope;
use crate::ws::BROADCAST_CHANNEL_CAPACITY;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{debug, info, instrument};

pub struct ChatMap {
    /// broadcast sender of each chat with at least one subscriber, by chat_id
    channels: DashMap<i64, Sender<Arc<RelayEnvelope>>>,
}

impl Default for ChatMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatMap {
    pub fn new() -> Self {
        ChatMap {
            channels: DashMap::new(),
        }
    }

    #[instrument(skip(self))]
    pub fn subscribe(&self, chat_id: i64) -> Receiver<Arc<RelayEnvelope>> {
        // entry() holds the shard lock, so two first subscribers cannot create two channels
        self.channels
            .entry(chat_id)
            .or_insert_with(|| {
                info!("Creating new broadcast channel for chat");
                broadcast::channel::<Arc<RelayEnvelope>>(BROADCAST_CHANNEL_CAPACITY).0
            })
            .subscribe()
    }

    #[instrument(skip(self, chat_ids))]
    pub fn subscribe_multiple(&self, chat_ids: &[i64]) -> Vec<Receiver<Arc<RelayEnvelope>>> {
        debug!(count = chat_ids.len(), "Subscribing to multiple chats");
        chat_ids.iter().map(|id| self.subscribe(*id)).collect()
    }

    /// Fire-and-forget: returns the number of receivers reached (0 if nobody listens)
    #[instrument(skip(self, envelope))]
    pub fn send(&self, chat_id: i64, envelope: Arc<RelayEnvelope>) -> usize {
        let Some(chat) = self.channels.get(&chat_id) else {
            debug!("No subscribers for chat channel");
            return 0;
        };

        match chat.send(envelope) {
            Ok(n) => {
                debug!(receivers = n, "Event broadcast to receivers");
                n
            }
            Err(_) => {
                debug!("No active receivers, removing channel");
                drop(chat);
                self.channels
                    .remove_if(&chat_id, |_, tx| tx.receiver_count() == 0);
                0
            }
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
