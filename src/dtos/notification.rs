//! Notification DTOs - Data Transfer Objects per le notifiche

use crate::entities::{
    Notification, NotificationCategory, NotificationPriority, NotificationType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationDTO {
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

impl From<Notification> for NotificationDTO {
    fn from(value: Notification) -> Self {
        Self {
            notification_id: value.notification_id,
            recipient_id: value.recipient_id,
            sender_id: value.sender_id,
            notification_type: value.notification_type,
            category: value.category,
            priority: value.priority,
            title: value.title,
            message: value.message,
            action_url: value.action_url,
            is_read: value.is_read,
            read_at: value.read_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationPageDTO {
    pub notifications: Vec<NotificationDTO>,
    pub unread_count: i64,
}

/// Body di PUT /notifications
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NotificationPutBody {
    Read {
        notification_id: i64,
    },
    ReadAll {
        #[serde(default)]
        category: Option<NotificationCategory>,
    },
}

/// DTO per creare una notifica; categoria e priorità derivano dal tipo
#[derive(Debug, Clone)]
pub struct CreateNotificationDTO {
    pub recipient_id: i64,
    pub sender_id: Option<i64>,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct UnreadCountDTO {
    pub unread_count: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct MarkAllReadResultDTO {
    pub updated: u64,
}
