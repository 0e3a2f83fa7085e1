use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::models::{Post, Session, User};
use crate::db::store::{CredentialStore, PostStore, SessionStore};
use crate::error::DatabaseError;

/// SQLSTATE raised by Postgres for `unique_violation`.
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Postgres-specific check for a rejected insert on a unique column.
pub fn is_uniqueness_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION),
        _ => false,
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if is_uniqueness_violation(&err) {
            let constraint = match &err {
                sqlx::Error::Database(db_err) => db_err.constraint().unwrap_or_default().to_string(),
                _ => String::new(),
            };
            return DatabaseError::Duplicate(constraint);
        }

        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}

/// Postgres-backed implementation of every store contract.
#[derive(Clone)]
pub struct DbOperations {
    pool: PgPool,
}

impl DbOperations {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for DbOperations {
    async fn create_user(&self, name: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, password_hash)
            VALUES ($1, $2)
            RETURNING id, name, password_hash
            "#,
        )
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_name(&self, name: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT id, name, password_hash FROM users WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT id, name, password_hash FROM users WHERE id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::NotFound)
    }
}

#[async_trait]
impl SessionStore for DbOperations {
    async fn create_session(&self, user_id: i64, access_token: &str) -> Result<Session, DatabaseError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, access_token)
            VALUES ($1, $2)
            RETURNING id, user_id, access_token
            "#,
        )
        .bind(user_id)
        .bind(access_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get_session_by_token(&self, access_token: &str) -> Result<Session, DatabaseError> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, access_token FROM sessions WHERE access_token = $1 LIMIT 1",
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound)
    }
}

#[async_trait]
impl PostStore for DbOperations {
    async fn create_post(
        &self,
        user_id: i64,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Post, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, body, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, body, created_at
            "#,
        )
        .bind(user_id)
        .bind(body)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn list_posts_by_user(&self, user_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, body, created_at FROM posts
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_map_by_kind() {
        assert!(!is_uniqueness_violation(&sqlx::Error::RowNotFound));
        assert!(matches!(DatabaseError::from(sqlx::Error::RowNotFound), DatabaseError::NotFound));
        assert!(matches!(
            DatabaseError::from(sqlx::Error::PoolTimedOut),
            DatabaseError::ConnectionError(_)
        ));
        assert!(matches!(
            DatabaseError::from(sqlx::Error::ColumnNotFound("name".into())),
            DatabaseError::QueryError(_)
        ));
    }
}
