//! Connection DTOs - Data Transfer Objects per le connessioni

use crate::entities::{Connection, ConnectionDecision, ConnectionStatus, ConnectionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConnectionDTO {
    pub connection_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: ConnectionStatus,
    pub connection_type: ConnectionType,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Connection> for ConnectionDTO {
    fn from(value: Connection) -> Self {
        Self {
            connection_id: value.connection_id,
            sender_id: value.sender_id,
            receiver_id: value.receiver_id,
            status: value.status,
            connection_type: value.connection_type,
            message: value.message,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

fn default_connection_type() -> ConnectionType {
    ConnectionType::Professional
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct ConnectionRequestDTO {
    pub receiver_id: i64,
    #[serde(default = "default_connection_type")]
    pub connection_type: ConnectionType,
    #[validate(length(max = 500, message = "Message must be at most 500 characters"))]
    pub message: Option<String>,
}

/// Body di POST /connections
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConnectionPostBody {
    Request(ConnectionRequestDTO),
}

/// Body di PUT /connections
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConnectionPutBody {
    Respond {
        connection_id: i64,
        decision: ConnectionDecision,
    },
}

/// Body di DELETE /connections
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConnectionDeleteBody {
    Withdraw { connection_id: i64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct BlockDTO {
    pub target_id: i64,
}

/// DTO per creare una nuova richiesta (senza connection_id)
#[derive(Debug, Clone)]
pub struct CreateConnectionDTO {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub connection_type: ConnectionType,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_is_tagged_by_action() {
        let body: ConnectionPostBody = serde_json::from_value(json!({
            "action": "request",
            "receiver_id": 2,
            "connection_type": "MENTOR"
        }))
        .unwrap();
        let ConnectionPostBody::Request(request) = body;
        assert_eq!(request.receiver_id, 2);
        assert_eq!(request.connection_type, ConnectionType::Mentor);
        assert!(request.message.is_none());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let body = serde_json::from_value::<ConnectionPutBody>(json!({
            "action": "withdraw",
            "connection_id": 1
        }));
        assert!(body.is_err());
    }

    #[test]
    fn connection_type_defaults_to_professional() {
        let body: ConnectionPostBody =
            serde_json::from_value(json!({ "action": "request", "receiver_id": 5 })).unwrap();
        let ConnectionPostBody::Request(request) = body;
        assert_eq!(request.connection_type, ConnectionType::Professional);
    }
}
