//! Enumerazioni - Tipi enumerati utilizzati nelle entità
//!
//! Every enum is stored as TEXT in SCREAMING_SNAKE_CASE and serialized the same
//! way on the wire, so the values in the database and in JSON always match.

use serde::{Deserialize, Serialize};

// ********************* CONNESSIONI **********************//

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Declined,
    Blocked,
    Withdrawn,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "connection_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    Collaborator,
    Mentor,
    Mentee,
    Friend,
    Colleague,
    Professional,
}

/// Risposta del destinatario a una richiesta pendente
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionDecision {
    Accepted,
    Declined,
}

impl From<ConnectionDecision> for ConnectionStatus {
    fn from(value: ConnectionDecision) -> Self {
        match value {
            ConnectionDecision::Accepted => ConnectionStatus::Accepted,
            ConnectionDecision::Declined => ConnectionStatus::Declined,
        }
    }
}

// ********************* PRIVACY **********************//

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "connection_privacy", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionPrivacy {
    #[default]
    Everyone,
    ConnectionsOfConnections,
    Nobody,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "message_privacy", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePrivacy {
    #[default]
    Everyone,
    Connections,
    Nobody,
}

// ********************* CHAT E MESSAGGI **********************//

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "chat_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    Direct,
    Group,
    Project,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "message_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    File,
    Code,
    System,
}

impl MessageType {
    /// Attachments are gated by the chat's file-sharing setting
    pub fn is_attachment(&self) -> bool {
        matches!(self, MessageType::Image | MessageType::File)
    }
}

// ********************* NOTIFICHE **********************//

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ConnectionRequest,
    ConnectionAccepted,
    ConnectionDeclined,
    ConnectionBlocked,
    NewFollower,
    NewMessage,
    System,
}

impl NotificationType {
    pub fn category(&self) -> NotificationCategory {
        match self {
            NotificationType::ConnectionRequest
            | NotificationType::ConnectionAccepted
            | NotificationType::ConnectionDeclined
            | NotificationType::ConnectionBlocked => NotificationCategory::Connection,
            NotificationType::NewFollower => NotificationCategory::Network,
            NotificationType::NewMessage => NotificationCategory::Message,
            NotificationType::System => NotificationCategory::System,
        }
    }

    pub fn default_priority(&self) -> NotificationPriority {
        match self {
            NotificationType::ConnectionRequest | NotificationType::ConnectionAccepted => {
                NotificationPriority::High
            }
            NotificationType::ConnectionDeclined | NotificationType::NewFollower => {
                NotificationPriority::Low
            }
            _ => NotificationPriority::Normal,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    Connection,
    Network,
    Message,
    System,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_screaming_snake_case_on_the_wire() {
        let json = serde_json::to_string(&NotificationType::ConnectionAccepted).unwrap();
        assert_eq!(json, "\"CONNECTION_ACCEPTED\"");
        let privacy: ConnectionPrivacy =
            serde_json::from_str("\"CONNECTIONS_OF_CONNECTIONS\"").unwrap();
        assert_eq!(privacy, ConnectionPrivacy::ConnectionsOfConnections);
    }

    #[test]
    fn notification_types_map_to_categories() {
        assert_eq!(
            NotificationType::ConnectionRequest.category(),
            NotificationCategory::Connection
        );
        assert_eq!(NotificationType::NewFollower.category(), NotificationCategory::Network);
        assert_eq!(NotificationType::NewMessage.category(), NotificationCategory::Message);
    }
}
