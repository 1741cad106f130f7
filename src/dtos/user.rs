//! User DTOs - Data Transfer Objects per utenti

use crate::entities::{ConnectionPrivacy, MessagePrivacy, User};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
}

// struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserDTO {
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub headline: Option<String>,
    pub connection_privacy: ConnectionPrivacy,
    pub message_privacy: MessagePrivacy,
    pub created_at: DateTime<Utc>,
    /// presente solo nel profilo singolo
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub online: Option<bool>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username,
            display_name: value.display_name,
            headline: value.headline,
            connection_privacy: value.connection_privacy,
            message_privacy: value.message_privacy,
            created_at: value.created_at,
            online: None, // la password non viene mai esposta al client
        }
    }
}

/// DTO per creare un nuovo utente (senza user_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateUserDTO {
    #[validate(regex(
        path = *USERNAME_RE,
        message = "Username must be 3-32 characters of letters, digits, '_', '.' or '-'"
    ))]
    pub username: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub display_name: Option<String>,
}

/// DTO per il login (solo username e password)
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginDTO {
    pub username: String,
    pub password: String,
}

/// Aggiornamento parziale di profilo e impostazioni di privacy
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdatePrivacyDTO {
    pub connection_privacy: Option<ConnectionPrivacy>,
    pub message_privacy: Option<MessagePrivacy>,
    #[validate(length(min = 1, max = 64))]
    pub display_name: Option<String>,
    #[validate(length(max = 160))]
    pub headline: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct PresencePingDTO {
    pub online: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PresenceDTO {
    pub user_id: i64,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}
