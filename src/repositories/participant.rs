//! ChatParticipantRepository - Repository per i partecipanti delle chat

use super::Read;
use crate::entities::ChatParticipant;
use chrono::Utc;
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, instrument};

const PARTICIPANT_COLUMNS: &str = "chat_id, user_id, is_admin, is_active, joined_at, left_at";

// CHAT PARTICIPANT REPO
pub struct ChatParticipantRepository {
    connection_pool: SqlitePool,
}

impl ChatParticipantRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// All participants of a chat (including the ones who left), in join order
    pub async fn find_many_by_chat(&self, chat_id: i64) -> Result<Vec<ChatParticipant>, Error> {
        sqlx::query_as::<_, ChatParticipant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM chat_participants \
             WHERE chat_id = ? ORDER BY joined_at, user_id"
        ))
        .bind(chat_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Participants of several chats at once, used to build chat lists
    pub async fn find_many_by_chats(&self, chat_ids: &[i64]) -> Result<Vec<ChatParticipant>, Error> {
        if chat_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM chat_participants WHERE chat_id IN ("
        ));
        let mut separated = query_builder.separated(", ");
        for id in chat_ids {
            separated.push_bind(*id);
        }
        query_builder.push(") ORDER BY chat_id, joined_at, user_id");

        query_builder
            .build_query_as::<ChatParticipant>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Ids of the chats where the user is currently active
    pub async fn find_active_chat_ids(&self, user_id: i64) -> Result<Vec<i64>, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT chat_id FROM chat_participants WHERE user_id = ? AND is_active = 1",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Mark the participant as gone, keeping the row for history
    #[instrument(skip(self))]
    pub async fn deactivate(&self, chat_id: i64, user_id: i64) -> Result<(), Error> {
        sqlx::query(
            "UPDATE chat_participants SET is_active = 0, is_admin = 0, left_at = ? \
             WHERE chat_id = ? AND user_id = ?",
        )
        .bind(Utc::now())
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    /// Insert a new participant or re-activate one who left
    #[instrument(skip(self))]
    pub async fn upsert_active(
        &self,
        chat_id: i64,
        user_id: i64,
        is_admin: bool,
    ) -> Result<ChatParticipant, Error> {
        debug!("Adding participant");
        sqlx::query_as::<_, ChatParticipant>(&format!(
            "INSERT INTO chat_participants (chat_id, user_id, is_admin, is_active, joined_at) \
             VALUES (?, ?, ?, 1, ?) \
             ON CONFLICT (chat_id, user_id) \
             DO UPDATE SET is_active = 1, is_admin = excluded.is_admin, \
                           joined_at = excluded.joined_at, left_at = NULL \
             RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(chat_id)
        .bind(user_id)
        .bind(is_admin)
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await
    }

    pub async fn count_active(&self, chat_id: i64) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chat_participants WHERE chat_id = ? AND is_active = 1",
        )
        .bind(chat_id)
        .fetch_one(&self.connection_pool)
        .await
    }

    pub async fn count_active_admins(&self, chat_id: i64) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chat_participants \
             WHERE chat_id = ? AND is_active = 1 AND is_admin = 1",
        )
        .bind(chat_id)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<ChatParticipant, (i64, i64)> for ChatParticipantRepository {
    /// Key is `(chat_id, user_id)`
    async fn read(&self, id: &(i64, i64)) -> Result<Option<ChatParticipant>, Error> {
        sqlx::query_as::<_, ChatParticipant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM chat_participants WHERE chat_id = ? AND user_id = ?"
        ))
        .bind(id.0)
        .bind(id.1)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
