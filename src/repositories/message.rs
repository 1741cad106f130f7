//! MessageRepository - Repository per messaggi, conferme di lettura e reazioni

use super::{Create, Read, Update};
use crate::dtos::{CreateMessageDTO, MessagesQuery, UpdateMessageDTO};
use crate::entities::{Message, Reaction, ReadReceipt};
use chrono::Utc;
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, instrument};

const MESSAGE_COLUMNS: &str = "message_id, chat_id, sender_id, content, message_type, reply_to_id, \
     is_edited, is_deleted, created_at, updated_at";

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Get a page of messages for a chat, newest first.
    ///
    /// `before` and `before_id` are exclusive cursors: only strictly older messages
    /// are returned. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    #[instrument(skip(self, params), fields(chat_id = %chat_id))]
    pub async fn find_many_paginated(
        &self,
        chat_id: i64,
        params: &MessagesQuery,
    ) -> Result<Vec<Message>, Error> {
        let limit = params
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = params.offset.unwrap_or(0).max(0);

        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = "
        ));
        query_builder.push_bind(chat_id);
        if let Some(before) = params.before {
            query_builder.push(" AND created_at < ");
            query_builder.push_bind(before);
        }
        if let Some(before_id) = params.before_id {
            query_builder.push(" AND message_id < ");
            query_builder.push_bind(before_id);
        }
        query_builder.push(" ORDER BY created_at DESC, message_id DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let messages = query_builder
            .build_query_as::<Message>()
            .fetch_all(&self.connection_pool)
            .await?;

        debug!("Loaded {} messages", messages.len());
        Ok(messages)
    }

    pub async fn count_by_chat(&self, chat_id: i64) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.connection_pool)
            .await
    }

    /// Read receipts of the given messages, oldest receipt first
    pub async fn find_read_receipts(&self, message_ids: &[i64]) -> Result<Vec<ReadReceipt>, Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT message_id, user_id, read_at FROM message_reads WHERE message_id IN (",
        );
        let mut separated = query_builder.separated(", ");
        for id in message_ids {
            separated.push_bind(*id);
        }
        query_builder.push(") ORDER BY read_at, user_id");

        query_builder
            .build_query_as::<ReadReceipt>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Reactions of the given messages, in insertion order
    pub async fn find_reactions(&self, message_ids: &[i64]) -> Result<Vec<Reaction>, Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT message_id, user_id, emoji, created_at FROM message_reactions WHERE message_id IN (",
        );
        let mut separated = query_builder.separated(", ");
        for id in message_ids {
            separated.push_bind(*id);
        }
        query_builder.push(") ORDER BY created_at, user_id");

        query_builder
            .build_query_as::<Reaction>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Add a receipt for every message of the chat the user has not read yet.
    /// Existing receipts are never touched, so calling this twice is a no-op.
    /// Returns the number of newly marked messages.
    #[instrument(skip(self))]
    pub async fn mark_chat_as_read(&self, chat_id: i64, user_id: i64) -> Result<u64, Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) \
             SELECT message_id, ?, ? FROM messages WHERE chat_id = ?",
        )
        .bind(user_id)
        .bind(Utc::now())
        .bind(chat_id)
        .execute(&self.connection_pool)
        .await?;

        info!("Marked {} messages as read", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Soft delete: the row stays so replies and receipts keep pointing at it
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, message_id: i64) -> Result<(), Error> {
        sqlx::query(
            "UPDATE messages SET is_deleted = 1, content = '', updated_at = ? WHERE message_id = ?",
        )
        .bind(Utc::now())
        .bind(message_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    /// Add the reaction if missing, remove it otherwise. Returns true when it was added.
    #[instrument(skip(self))]
    pub async fn toggle_reaction(
        &self,
        message_id: i64,
        user_id: i64,
        emoji: &str,
    ) -> Result<bool, Error> {
        let removed = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = ? AND user_id = ? AND emoji = ?",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&self.connection_pool)
        .await?;

        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO message_reactions (message_id, user_id, emoji, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .bind(Utc::now())
        .execute(&self.connection_pool)
        .await?;

        Ok(true)
    }
}

impl Create<Message, CreateMessageDTO> for MessageRepository {
    /// Message and the sender's own read receipt are written together
    #[instrument(skip(self, data), fields(chat_id = %data.chat_id, sender_id = %data.sender_id))]
    async fn create(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        let now = Utc::now();
        let mut tx = self.connection_pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages \
                (chat_id, sender_id, content, message_type, reply_to_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(data.chat_id)
        .bind(data.sender_id)
        .bind(&data.content)
        .bind(data.message_type)
        .bind(data.reply_to_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)")
            .bind(message.message_id)
            .bind(data.sender_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }
}

impl Read<Message, i64> for MessageRepository {
    async fn read(&self, id: &i64) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<Message, UpdateMessageDTO, i64> for MessageRepository {
    async fn update(&self, id: &i64, data: &UpdateMessageDTO) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(&format!(
            "UPDATE messages SET content = ?, is_edited = 1, updated_at = ? \
             WHERE message_id = ? \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(&data.content)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }
}
