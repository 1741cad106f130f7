//! UserRepository - Repository per la gestione degli utenti

use super::{Create, Read, ReadMany, Update};
use crate::dtos::{CreateUserDTO, UpdatePrivacyDTO};
use crate::entities::User;
use chrono::Utc;
use sqlx::{Error, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, instrument};

const USER_COLUMNS: &str = "user_id, username, password, display_name, headline, \
     connection_privacy, message_privacy, created_at";

// USER REPO
pub struct UserRepository {
    connection_pool: SqlitePool,
}

impl UserRepository {
    pub fn new(connection_pool: SqlitePool) -> UserRepository {
        Self { connection_pool }
    }

    /// Find user by exact username match (usernames are unique)
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Search users by username prefix, at most 10 results
    #[instrument(skip(self))]
    pub async fn search_by_username_partial(&self, username_pattern: &str) -> Result<Vec<User>, Error> {
        let pattern = format!("{}%", username_pattern);
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username LIKE ? ORDER BY username LIMIT 10"
        ))
        .bind(pattern)
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Create<User, CreateUserDTO> for UserRepository {
    #[instrument(skip(self, data), fields(username = %data.username))]
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        debug!("Inserting user");
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password, display_name, created_at) \
             VALUES (?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(&data.username)
        .bind(&data.password)
        .bind(&data.display_name)
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<User, i64> for UserRepository {
    async fn read(&self, id: &i64) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"))
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl ReadMany<User, i64> for UserRepository {
    async fn read_many(&self, ids: &[i64]) -> Result<Vec<User>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE user_id IN ("));
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        query_builder.push(")");

        query_builder
            .build_query_as::<User>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

impl Update<User, UpdatePrivacyDTO, i64> for UserRepository {
    #[instrument(skip(self, data), fields(user_id = %id))]
    async fn update(&self, id: &i64, data: &UpdatePrivacyDTO) -> Result<User, Error> {
        let current_user = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.connection_privacy.is_none()
            && data.message_privacy.is_none()
            && data.display_name.is_none()
            && data.headline.is_none()
        {
            debug!("No fields to update, returning current user");
            return Ok(current_user);
        }

        // Build dynamic UPDATE query using QueryBuilder (idiomatic SQLx way)
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(privacy) = data.connection_privacy {
            separated.push("connection_privacy = ");
            separated.push_bind_unseparated(privacy);
        }
        if let Some(privacy) = data.message_privacy {
            separated.push("message_privacy = ");
            separated.push_bind_unseparated(privacy);
        }
        if let Some(ref display_name) = data.display_name {
            separated.push("display_name = ");
            separated.push_bind_unseparated(display_name.clone());
        }
        if let Some(ref headline) = data.headline {
            separated.push("headline = ");
            separated.push_bind_unseparated(headline.clone());
        }
        query_builder.push(" WHERE user_id = ");
        query_builder.push_bind(*id);

        query_builder.build().execute(&self.connection_pool).await?;

        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
