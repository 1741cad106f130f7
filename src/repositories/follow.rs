//! FollowRepository - Repository per le relazioni di follow

use crate::entities::{Follow, User};
use chrono::Utc;
use sqlx::{Error, SqlitePool};
use tracing::instrument;

// FOLLOW REPO
pub struct FollowRepository {
    connection_pool: SqlitePool,
}

impl FollowRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, follower_id: i64, followee_id: i64) -> Result<Follow, Error> {
        sqlx::query_as::<_, Follow>(
            "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?) \
             RETURNING follower_id, followee_id, created_at",
        )
        .bind(follower_id)
        .bind(followee_id)
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await
    }

    pub async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND followee_id = ?)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// Returns false if there was nothing to delete
    #[instrument(skip(self))]
    pub async fn delete_pair(&self, follower_id: i64, followee_id: i64) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop follows in both directions, used when one user blocks the other
    #[instrument(skip(self))]
    pub async fn delete_between(&self, user_a: i64, user_b: i64) -> Result<u64, Error> {
        let result = sqlx::query(
            "DELETE FROM follows \
             WHERE (follower_id = ?1 AND followee_id = ?2) OR (follower_id = ?2 AND followee_id = ?1)",
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Users following `user_id`, most recent first
    pub async fn find_followers(&self, user_id: i64) -> Result<Vec<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.user_id, u.username, u.password, u.display_name, u.headline,
                   u.connection_privacy, u.message_privacy, u.created_at
            FROM follows f
            JOIN users u ON u.user_id = f.follower_id
            WHERE f.followee_id = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Users followed by `user_id`, most recent first
    pub async fn find_following(&self, user_id: i64) -> Result<Vec<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.user_id, u.username, u.password, u.display_name, u.headline,
                   u.connection_privacy, u.message_privacy, u.created_at
            FROM follows f
            JOIN users u ON u.user_id = f.followee_id
            WHERE f.follower_id = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}
