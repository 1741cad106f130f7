//! User entity - Entità utente con metodi per gestione password

use super::enums::{ConnectionPrivacy, MessagePrivacy};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub display_name: Option<String>,
    pub headline: Option<String>,
    pub connection_privacy: ConnectionPrivacy,
    pub message_privacy: MessagePrivacy,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Verify if target_password matches the stored hashed password
    pub fn verify_password(&self, target_password: &str) -> bool {
        verify(target_password, &self.password).unwrap_or(false)
    }

    /// Hash a password using bcrypt with default cost
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        let hash = hash(password, DEFAULT_COST)?;
        Ok(hash)
    }
}

/// Relazione di follow unilaterale
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: i64,
    pub followee_id: i64,
    pub created_at: DateTime<Utc>,
}
