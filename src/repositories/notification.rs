//! NotificationRepository - Repository per le notifiche

use super::{Create, Delete, Read};
use crate::dtos::{CreateNotificationDTO, NotificationsQuery};
use crate::entities::{Notification, NotificationCategory};
use chrono::Utc;
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, instrument};

const NOTIFICATION_COLUMNS: &str = "notification_id, recipient_id, sender_id, notification_type, \
     category, priority, title, message, action_url, is_read, read_at, created_at";

pub const DEFAULT_NOTIFICATION_PAGE: i64 = 20;
pub const MAX_NOTIFICATION_PAGE: i64 = 100;

// NOTIFICATION REPO
pub struct NotificationRepository {
    connection_pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Filtered page of a user's notifications, newest first
    #[instrument(skip(self, params))]
    pub async fn find_many_by_recipient(
        &self,
        recipient_id: i64,
        params: &NotificationsQuery,
    ) -> Result<Vec<Notification>, Error> {
        let limit = params
            .limit
            .unwrap_or(DEFAULT_NOTIFICATION_PAGE)
            .clamp(1, MAX_NOTIFICATION_PAGE);
        let offset = params.offset.unwrap_or(0).max(0);

        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = "
        ));
        query_builder.push_bind(recipient_id);
        if params.unread_only.unwrap_or(false) {
            query_builder.push(" AND is_read = 0");
        }
        if let Some(category) = params.category {
            query_builder.push(" AND category = ");
            query_builder.push_bind(category);
        }
        query_builder.push(" ORDER BY created_at DESC, notification_id DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        query_builder
            .build_query_as::<Notification>()
            .fetch_all(&self.connection_pool)
            .await
    }

    pub async fn count_unread(
        &self,
        recipient_id: i64,
        category: Option<NotificationCategory>,
    ) -> Result<i64, Error> {
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM notifications WHERE is_read = 0 AND recipient_id = ",
        );
        query_builder.push_bind(recipient_id);
        if let Some(category) = category {
            query_builder.push(" AND category = ");
            query_builder.push_bind(category);
        }

        query_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await
    }

    /// Set is_read/read_at; an already read notification keeps its original read_at
    #[instrument(skip(self))]
    pub async fn mark_as_read(&self, notification_id: i64) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?) \
             WHERE notification_id = ? \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(notification_id)
        .fetch_optional(&self.connection_pool)
        .await?
        .ok_or(Error::RowNotFound)
    }

    /// Bulk read, optionally scoped to one category. Returns the number of updated rows.
    #[instrument(skip(self))]
    pub async fn mark_all_as_read(
        &self,
        recipient_id: i64,
        category: Option<NotificationCategory>,
    ) -> Result<u64, Error> {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE notifications SET is_read = 1, read_at = ");
        query_builder.push_bind(Utc::now());
        query_builder.push(" WHERE is_read = 0 AND recipient_id = ");
        query_builder.push_bind(recipient_id);
        if let Some(category) = category {
            query_builder.push(" AND category = ");
            query_builder.push_bind(category);
        }

        let result = query_builder.build().execute(&self.connection_pool).await?;
        debug!("Marked {} notifications as read", result.rows_affected());
        Ok(result.rows_affected())
    }
}

impl Create<Notification, CreateNotificationDTO> for NotificationRepository {
    #[instrument(skip(self, data), fields(recipient_id = %data.recipient_id, kind = ?data.notification_type))]
    async fn create(&self, data: &CreateNotificationDTO) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications \
                (recipient_id, sender_id, notification_type, category, priority, title, message, \
                 action_url, is_read, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?) \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(data.recipient_id)
        .bind(data.sender_id)
        .bind(data.notification_type)
        .bind(data.notification_type.category())
        .bind(data.notification_type.default_priority())
        .bind(&data.title)
        .bind(&data.message)
        .bind(&data.action_url)
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<Notification, i64> for NotificationRepository {
    async fn read(&self, id: &i64) -> Result<Option<Notification>, Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Delete<i64> for NotificationRepository {
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        sqlx::query("DELETE FROM notifications WHERE notification_id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        Ok(())
    }
}
