//! Query DTOs - Data Transfer Objects per query di ricerca

use crate::entities::{ConnectionStatus, ConnectionType, NotificationCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DTO per query parameters di ricerca utenti
#[derive(Serialize, Deserialize, Debug)]
pub struct UserSearchQuery {
    pub search: String,
}

/// DTO per query parameters di paginazione messaggi
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// only messages strictly older than this instant
    pub before: Option<DateTime<Utc>>,
    /// only messages with a strictly smaller id
    pub before_id: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ConnectionsQuery {
    pub status: Option<ConnectionStatus>,
    pub connection_type: Option<ConnectionType>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct NotificationsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub unread_only: Option<bool>,
    pub category: Option<NotificationCategory>,
}

/// Filtro opzionale per il conteggio delle notifiche non lette
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct UnreadCountQuery {
    pub category: Option<NotificationCategory>,
}
