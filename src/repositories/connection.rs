//! ConnectionRepository - Repository per le connessioni tra utenti

use super::{Create, Read};
use crate::dtos::{ConnectionsQuery, CreateConnectionDTO};
use crate::entities::{Connection, ConnectionStatus, ConnectionType};
use chrono::Utc;
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, instrument};

const CONNECTION_COLUMNS: &str = "connection_id, sender_id, receiver_id, status, connection_type, \
     message, created_at, updated_at";

// CONNECTION REPO
pub struct ConnectionRepository {
    connection_pool: SqlitePool,
}

impl ConnectionRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Directed lookup: the row from `sender_id` to `receiver_id`, if any
    #[instrument(skip(self))]
    pub async fn find_between(
        &self,
        sender_id: i64,
        receiver_id: i64,
    ) -> Result<Option<Connection>, Error> {
        sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE sender_id = ? AND receiver_id = ?"
        ))
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// True if either user has a BLOCKED row towards the other
    pub async fn is_blocked_between(&self, user_a: i64, user_b: i64) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM connections
                WHERE status = 'BLOCKED'
                  AND ((sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))
            )
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// True if an ACCEPTED connection exists in either direction
    pub async fn are_connected(&self, user_a: i64, user_b: i64) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM connections
                WHERE status = 'ACCEPTED'
                  AND ((sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1))
            )
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// True if the two users share at least one accepted connection with a third user
    pub async fn has_mutual_connection(&self, user_a: i64, user_b: i64) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM connections a
                JOIN connections b
                  ON (CASE WHEN a.sender_id = ?1 THEN a.receiver_id ELSE a.sender_id END)
                   = (CASE WHEN b.sender_id = ?2 THEN b.receiver_id ELSE b.sender_id END)
                WHERE a.status = 'ACCEPTED' AND b.status = 'ACCEPTED'
                  AND (a.sender_id = ?1 OR a.receiver_id = ?1)
                  AND (b.sender_id = ?2 OR b.receiver_id = ?2)
            )
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// Connections of a user in either direction, newest first.
    /// BLOCKED rows are only visible to the blocker.
    #[instrument(skip(self, filter))]
    pub async fn find_many_by_user(
        &self,
        user_id: i64,
        filter: &ConnectionsQuery,
    ) -> Result<Vec<Connection>, Error> {
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE ((sender_id = "
        ));
        query_builder.push_bind(user_id);
        query_builder.push(") OR (receiver_id = ");
        query_builder.push_bind(user_id);
        query_builder.push(" AND status <> 'BLOCKED'))");

        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }
        if let Some(connection_type) = filter.connection_type {
            query_builder.push(" AND connection_type = ");
            query_builder.push_bind(connection_type);
        }
        query_builder.push(" ORDER BY updated_at DESC, connection_id DESC");

        query_builder
            .build_query_as::<Connection>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Reuse a DECLINED row for a new request in the same direction
    #[instrument(skip(self, message))]
    pub async fn reset_to_pending(
        &self,
        connection_id: i64,
        connection_type: ConnectionType,
        message: Option<&str>,
    ) -> Result<Option<Connection>, Error> {
        sqlx::query_as::<_, Connection>(&format!(
            "UPDATE connections \
             SET status = 'PENDING', connection_type = ?, message = ?, updated_at = ? \
             WHERE connection_id = ? AND status = 'DECLINED' \
             RETURNING {CONNECTION_COLUMNS}"
        ))
        .bind(connection_type)
        .bind(message)
        .bind(Utc::now())
        .bind(connection_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Conditional transition out of PENDING.
    /// Returns `None` when the row was no longer pending (a concurrent response won).
    #[instrument(skip(self))]
    pub async fn update_status_if_pending(
        &self,
        connection_id: i64,
        new_status: ConnectionStatus,
    ) -> Result<Option<Connection>, Error> {
        let updated = sqlx::query_as::<_, Connection>(&format!(
            "UPDATE connections SET status = ?, updated_at = ? \
             WHERE connection_id = ? AND status = 'PENDING' \
             RETURNING {CONNECTION_COLUMNS}"
        ))
        .bind(new_status)
        .bind(Utc::now())
        .bind(connection_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        if updated.is_some() {
            info!("Connection moved to {:?}", new_status);
        } else {
            debug!("Connection was not pending anymore");
        }
        Ok(updated)
    }

    /// Delete a PENDING row owned by `sender_id`. Returns false if nothing was deleted.
    #[instrument(skip(self))]
    pub async fn delete_if_pending(&self, connection_id: i64, sender_id: i64) -> Result<bool, Error> {
        let result = sqlx::query(
            "DELETE FROM connections WHERE connection_id = ? AND sender_id = ? AND status = 'PENDING'",
        )
        .bind(connection_id)
        .bind(sender_id)
        .execute(&self.connection_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Upsert the (blocker → target) row to BLOCKED regardless of its previous state,
    /// and drop the reverse row unless it is itself a block.
    /// The flag is true only for the call that actually moved the row to BLOCKED.
    #[instrument(skip(self))]
    pub async fn upsert_block(
        &self,
        blocker_id: i64,
        target_id: i64,
    ) -> Result<(Connection, bool), Error> {
        let now = Utc::now();
        let mut tx = self.connection_pool.begin().await?;

        // se la riga è già BLOCKED l'upsert non scrive nulla e RETURNING resta vuoto
        let changed = sqlx::query_as::<_, Connection>(&format!(
            "INSERT INTO connections \
                (sender_id, receiver_id, status, connection_type, message, created_at, updated_at) \
             VALUES (?, ?, 'BLOCKED', 'PROFESSIONAL', NULL, ?, ?) \
             ON CONFLICT (sender_id, receiver_id) \
             DO UPDATE SET status = 'BLOCKED', message = NULL, updated_at = excluded.updated_at \
             WHERE connections.status <> 'BLOCKED' \
             RETURNING {CONNECTION_COLUMNS}"
        ))
        .bind(blocker_id)
        .bind(target_id)
        .bind(now)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let (blocked, newly_blocked) = match changed {
            Some(row) => (row, true),
            None => {
                let row = sqlx::query_as::<_, Connection>(&format!(
                    "SELECT {CONNECTION_COLUMNS} FROM connections WHERE sender_id = ? AND receiver_id = ?"
                ))
                .bind(blocker_id)
                .bind(target_id)
                .fetch_one(&mut *tx)
                .await?;
                (row, false)
            }
        };

        sqlx::query(
            "DELETE FROM connections WHERE sender_id = ? AND receiver_id = ? AND status <> 'BLOCKED'",
        )
        .bind(target_id)
        .bind(blocker_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((blocked, newly_blocked))
    }

    /// Remove the BLOCKED row from blocker to target. Returns false if there was none.
    #[instrument(skip(self))]
    pub async fn delete_block(&self, blocker_id: i64, target_id: i64) -> Result<bool, Error> {
        let result = sqlx::query(
            "DELETE FROM connections WHERE sender_id = ? AND receiver_id = ? AND status = 'BLOCKED'",
        )
        .bind(blocker_id)
        .bind(target_id)
        .execute(&self.connection_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl Create<Connection, CreateConnectionDTO> for ConnectionRepository {
    #[instrument(skip(self, data), fields(sender = %data.sender_id, receiver = %data.receiver_id))]
    async fn create(&self, data: &CreateConnectionDTO) -> Result<Connection, Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Connection>(&format!(
            "INSERT INTO connections \
                (sender_id, receiver_id, status, connection_type, message, created_at, updated_at) \
             VALUES (?, ?, 'PENDING', ?, ?, ?, ?) \
             RETURNING {CONNECTION_COLUMNS}"
        ))
        .bind(data.sender_id)
        .bind(data.receiver_id)
        .bind(data.connection_type)
        .bind(&data.message)
        .bind(now)
        .bind(now)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<Connection, i64> for ConnectionRepository {
    async fn read(&self, id: &i64) -> Result<Option<Connection>, Error> {
        sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE connection_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
