//! WebSocket Event DTOs - Eventi inoltrati dal relay ai client WebSocket

use crate::dtos::{ConnectionDTO, MessageDTO, NotificationDTO};
use serde::{Deserialize, Serialize};

/// Tagged union per eventi del relay.
/// Serde serializza questo come:
/// { "event": "message:new", "data": { ... } }
/// oppure
/// { "event": "chat:read", "data": { "chat_id": 1, ... } }
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", content = "data")]
pub enum RelayEvent {
    #[serde(rename = "connection:requested")]
    ConnectionRequested(ConnectionDTO),
    #[serde(rename = "connection:accepted")]
    ConnectionAccepted(ConnectionDTO),
    #[serde(rename = "connection:declined")]
    ConnectionDeclined(ConnectionDTO),
    #[serde(rename = "connection:blocked")]
    ConnectionBlocked { blocker_id: i64 },
    #[serde(rename = "message:new")]
    MessageNew(MessageDTO),
    #[serde(rename = "message:updated")]
    MessageUpdated(MessageDTO),
    #[serde(rename = "chat:read")]
    ChatRead { chat_id: i64, user_id: i64, marked: u64 },
    #[serde(rename = "notification:new")]
    NotificationNew(NotificationDTO),
}

impl RelayEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::ConnectionRequested(_) => "connection:requested",
            RelayEvent::ConnectionAccepted(_) => "connection:accepted",
            RelayEvent::ConnectionDeclined(_) => "connection:declined",
            RelayEvent::ConnectionBlocked { .. } => "connection:blocked",
            RelayEvent::MessageNew(_) => "message:new",
            RelayEvent::MessageUpdated(_) => "message:updated",
            RelayEvent::ChatRead { .. } => "chat:read",
            RelayEvent::NotificationNew(_) => "notification:new",
        }
    }
}

/// Evento con il canale su cui è stato pubblicato (`user:{id}` o `chat:{id}`)
#[derive(Serialize, Debug, Clone)]
pub struct RelayEnvelope {
    pub channel: String,
    #[serde(flatten)]
    pub event: RelayEvent,
}

impl RelayEnvelope {
    pub fn for_user(user_id: i64, event: RelayEvent) -> Self {
        Self {
            channel: format!("user:{user_id}"),
            event,
        }
    }

    pub fn for_chat(chat_id: i64, event: RelayEvent) -> Self {
        Self {
            channel: format!("chat:{chat_id}"),
            event,
        }
    }
}

/// Frame inviati dal client sul WebSocket
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// keep-alive, marca l'utente online
    Ping,
    /// l'utente resta connesso ma si dichiara offline
    Away,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_channel_event_and_data() {
        let envelope = RelayEnvelope::for_chat(
            4,
            RelayEvent::ChatRead {
                chat_id: 4,
                user_id: 9,
                marked: 3,
            },
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["channel"], "chat:4");
        assert_eq!(value["event"], "chat:read");
        assert_eq!(value["data"]["marked"], 3);
    }

    #[test]
    fn client_ping_frame_is_parsed() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Ping);
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"dance"}"#).is_err());
    }
}
