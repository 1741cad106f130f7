//! Chat entity - Entità chat, impostazioni e partecipanti

use super::enums::ChatType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Chat {
    pub chat_id: i64,
    pub chat_type: ChatType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    #[sqlx(flatten)]
    pub settings: ChatSettings,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[serde(default)]
pub struct ChatSettings {
    pub allow_file_sharing: bool,
    pub allow_reactions: bool,
    pub mute_notifications: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            allow_file_sharing: true,
            allow_reactions: true,
            mute_notifications: false,
        }
    }
}

/// Chiave di unicità di una chat DIRECT: la coppia non ordinata di utenti come "min:max".
pub fn direct_key(user1_id: i64, user2_id: i64) -> String {
    format!("{}:{}", user1_id.min(user2_id), user1_id.max(user2_id))
}

/// Partecipazione di un utente a una chat.
/// Una riga non viene mai cancellata quando l'utente esce: `is_active` passa a false
/// e `left_at` registra l'istante di uscita.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ChatParticipant {
    pub chat_id: i64,
    pub user_id: i64,
    pub is_admin: bool,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_key_ignores_order() {
        assert_eq!(direct_key(7, 3), "3:7");
        assert_eq!(direct_key(3, 7), direct_key(7, 3));
        assert_ne!(direct_key(1, 23), direct_key(12, 3));
    }
}
