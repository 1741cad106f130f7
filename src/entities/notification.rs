//! Notification entity - Notifica destinata a un singolo utente

use super::enums::{NotificationCategory, NotificationPriority, NotificationType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub notification_id: i64,
    pub recipient_id: i64,
    pub sender_id: Option<i64>,
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
