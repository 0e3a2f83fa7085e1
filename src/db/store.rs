use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{Post, Session, User};
use crate::error::DatabaseError;

/// User records keyed by a globally unique name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with [`DatabaseError::Duplicate`] when the name is taken.
    async fn create_user(&self, name: &str, password_hash: &str) -> Result<User, DatabaseError>;

    async fn get_user_by_name(&self, name: &str) -> Result<User, DatabaseError>;

    async fn get_user_by_id(&self, id: i64) -> Result<User, DatabaseError>;
}

/// Session records keyed by a globally unique access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fails with [`DatabaseError::Duplicate`] when the token is already in use.
    async fn create_session(&self, user_id: i64, access_token: &str) -> Result<Session, DatabaseError>;

    async fn get_session_by_token(&self, access_token: &str) -> Result<Session, DatabaseError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(
        &self,
        user_id: i64,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Post, DatabaseError>;

    /// Oldest first.
    async fn list_posts_by_user(&self, user_id: i64) -> Result<Vec<Post>, DatabaseError>;
}
