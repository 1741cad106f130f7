//! Message entity - Entità messaggio, conferme di lettura e reazioni

use super::enums::MessageType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub message_id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    // campo rinominato perchè type è una parola protetta
    pub message_type: MessageType,
    pub reply_to_id: Option<i64>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conferma di lettura: una sola riga per (messaggio, utente), mai rimossa
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ReadReceipt {
    pub message_id: i64,
    pub user_id: i64,
    pub read_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Reaction {
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}
