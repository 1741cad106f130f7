//! Chat DTOs - Data Transfer Objects per chat

use crate::entities::{Chat, ChatParticipant, ChatSettings, ChatType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatDTO {
    pub chat_id: i64,
    pub chat_type: ChatType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub settings: ChatSettings,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participants: Vec<ParticipantDTO>,
}

impl ChatDTO {
    pub fn new(chat: Chat, participants: Vec<ChatParticipant>) -> Self {
        Self {
            chat_id: chat.chat_id,
            chat_type: chat.chat_type,
            name: chat.name,
            description: chat.description,
            avatar_url: chat.avatar_url,
            settings: chat.settings,
            created_by: chat.created_by,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            participants: participants.into_iter().map(ParticipantDTO::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParticipantDTO {
    pub user_id: i64,
    pub is_admin: bool,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl From<ChatParticipant> for ParticipantDTO {
    fn from(value: ChatParticipant) -> Self {
        Self {
            user_id: value.user_id,
            is_admin: value.is_admin,
            is_active: value.is_active,
            joined_at: value.joined_at,
            left_at: value.left_at,
        }
    }
}

/// Body di POST /chats
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateChatRequestDTO {
    pub chat_type: ChatType,
    #[validate(length(min = 1, max = 100, message = "Chat name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub avatar_url: Option<String>,
    /// altri partecipanti, il creatore viene aggiunto sempre
    #[serde(default)]
    pub participant_ids: Vec<i64>,
    pub settings: Option<ChatSettings>,
}

/// DTO per creare una nuova chat (senza chat_id)
#[derive(Debug, Clone)]
pub struct CreateChatDTO {
    pub chat_type: ChatType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub settings: ChatSettings,
    pub created_by: i64,
    pub participants: Vec<NewParticipant>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewParticipant {
    pub user_id: i64,
    pub is_admin: bool,
}

/// DTO per aggiornare nome e impostazioni della chat (solo campi modificabili)
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateChatSettingsDTO {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub allow_file_sharing: Option<bool>,
    pub allow_reactions: Option<bool>,
    pub mute_notifications: Option<bool>,
}

impl UpdateChatSettingsDTO {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.allow_file_sharing.is_none()
            && self.allow_reactions.is_none()
            && self.mute_notifications.is_none()
    }
}
