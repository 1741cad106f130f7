//! ChatRepository - Repository per la gestione delle chat

use super::{Create, Read, Update};
use crate::dtos::{CreateChatDTO, UpdateChatSettingsDTO};
use crate::entities::{direct_key, Chat, ChatType};
use chrono::Utc;
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, instrument};

const CHAT_COLUMNS: &str = "chat_id, chat_type, name, description, avatar_url, \
     allow_file_sharing, allow_reactions, mute_notifications, created_by, created_at, updated_at";

// CHAT REPOSITORY
pub struct ChatRepository {
    connection_pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Get the direct chat between two users (if exists)
    /// Lookup on `direct_key`, the same column the unique index guards
    #[instrument(skip(self), fields(user1 = %user1_id, user2 = %user2_id))]
    pub async fn find_direct_between(
        &self,
        user1_id: i64,
        user2_id: i64,
    ) -> Result<Option<Chat>, Error> {
        debug!("Finding direct chat between two users");
        let chat = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE chat_type = 'DIRECT' AND direct_key = ?"
        ))
        .bind(direct_key(user1_id, user2_id))
        .fetch_optional(&self.connection_pool)
        .await?;

        if chat.is_some() {
            info!("Direct chat found");
        } else {
            debug!("No direct chat found");
        }

        Ok(chat)
    }

    /// Chats where the user is an active participant, most recently active first
    #[instrument(skip(self))]
    pub async fn find_many_for_user(&self, user_id: i64) -> Result<Vec<Chat>, Error> {
        sqlx::query_as::<_, Chat>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats
            WHERE chat_id IN (
                SELECT chat_id FROM chat_participants WHERE user_id = ? AND is_active = 1
            )
            ORDER BY updated_at DESC, chat_id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Bump `updated_at` so the chat moves to the top of the list
    pub async fn touch(&self, chat_id: i64) -> Result<(), Error> {
        sqlx::query("UPDATE chats SET updated_at = ? WHERE chat_id = ?")
            .bind(Utc::now())
            .bind(chat_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }
}

impl Create<Chat, CreateChatDTO> for ChatRepository {
    /// Chat and participants are written in a single transaction
    #[instrument(skip(self, data), fields(chat_type = ?data.chat_type, participants = data.participants.len()))]
    async fn create(&self, data: &CreateChatDTO) -> Result<Chat, Error> {
        debug!("Creating new chat");
        let now = Utc::now();
        // una seconda DIRECT per la stessa coppia fallisce sull'indice unico
        let key = match (data.chat_type, data.participants.as_slice()) {
            (ChatType::Direct, [a, b]) => Some(direct_key(a.user_id, b.user_id)),
            _ => None,
        };
        let mut tx = self.connection_pool.begin().await?;

        let chat = sqlx::query_as::<_, Chat>(&format!(
            "INSERT INTO chats \
                (chat_type, name, description, avatar_url, allow_file_sharing, allow_reactions, \
                 mute_notifications, direct_key, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {CHAT_COLUMNS}"
        ))
        .bind(data.chat_type)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.avatar_url)
        .bind(data.settings.allow_file_sharing)
        .bind(data.settings.allow_reactions)
        .bind(data.settings.mute_notifications)
        .bind(key)
        .bind(data.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for participant in &data.participants {
            sqlx::query(
                "INSERT INTO chat_participants (chat_id, user_id, is_admin, is_active, joined_at) \
                 VALUES (?, ?, ?, 1, ?)",
            )
            .bind(chat.chat_id)
            .bind(participant.user_id)
            .bind(participant.is_admin)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Chat created with id {}", chat.chat_id);
        Ok(chat)
    }
}

impl Read<Chat, i64> for ChatRepository {
    #[instrument(skip(self), fields(chat_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<Chat>, Error> {
        debug!("Reading chat by id");
        sqlx::query_as::<_, Chat>(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE chat_id = ?"))
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Update<Chat, UpdateChatSettingsDTO, i64> for ChatRepository {
    #[instrument(skip(self, data), fields(chat_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateChatSettingsDTO) -> Result<Chat, Error> {
        debug!("Updating chat");
        let current_chat = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.is_empty() {
            debug!("No fields to update, returning current chat");
            return Ok(current_chat);
        }

        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE chats SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description.clone());
        }
        if let Some(allow) = data.allow_file_sharing {
            separated.push("allow_file_sharing = ");
            separated.push_bind_unseparated(allow);
        }
        if let Some(allow) = data.allow_reactions {
            separated.push("allow_reactions = ");
            separated.push_bind_unseparated(allow);
        }
        if let Some(mute) = data.mute_notifications {
            separated.push("mute_notifications = ");
            separated.push_bind_unseparated(mute);
        }
        separated.push("updated_at = ");
        separated.push_bind_unseparated(Utc::now());

        query_builder.push(" WHERE chat_id = ");
        query_builder.push_bind(*id);

        query_builder.build().execute(&self.connection_pool).await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
