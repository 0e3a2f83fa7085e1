use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::models::{Post, Session, User};
use crate::db::store::{CredentialStore, PostStore, SessionStore};
use crate::error::DatabaseError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<i64, User>,
    user_ids_by_name: HashMap<String, i64>,
    sessions: HashMap<String, Session>,
    posts: Vec<Post>,
    next_user_id: i64,
    next_session_id: i64,
    next_post_id: i64,
}

impl Tables {
    fn user(&self, id: i64) -> Option<&User> {
        self.users.get(&id)
    }

    fn require_user(&self, id: i64) -> Result<(), DatabaseError> {
        match self.user(id) {
            Some(_) => Ok(()),
            None => Err(DatabaseError::QueryError(format!(
                "foreign key violation: user {} does not exist",
                id
            ))),
        }
    }
}

/// Process-local store with the same constraint semantics as the Postgres
/// schema. Every check-then-insert happens under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn create_user(&self, name: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.user_ids_by_name.contains_key(name) {
            return Err(DatabaseError::Duplicate("users_name_key".to_string()));
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            name: name.to_string(),
            password_hash: password_hash.to_string(),
        };
        tables.user_ids_by_name.insert(user.name.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_name(&self, name: &str) -> Result<User, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .user_ids_by_name
            .get(name)
            .and_then(|id| tables.user(*id))
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, DatabaseError> {
        let tables = self.tables.read().await;
        tables.user(id).cloned().ok_or(DatabaseError::NotFound)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, user_id: i64, access_token: &str) -> Result<Session, DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.sessions.contains_key(access_token) {
            return Err(DatabaseError::Duplicate("sessions_access_token_key".to_string()));
        }
        tables.require_user(user_id)?;

        tables.next_session_id += 1;
        let session = Session {
            id: tables.next_session_id,
            user_id,
            access_token: access_token.to_string(),
        };
        tables.sessions.insert(session.access_token.clone(), session.clone());

        Ok(session)
    }

    async fn get_session_by_token(&self, access_token: &str) -> Result<Session, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .sessions
            .get(access_token)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn create_post(
        &self,
        user_id: i64,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Post, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.require_user(user_id)?;

        tables.next_post_id += 1;
        let post = Post {
            id: tables.next_post_id,
            user_id,
            body: body.to_string(),
            created_at,
        };
        tables.posts.push(post.clone());

        Ok(post)
    }

    async fn list_posts_by_user(&self, user_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(posts)
    }
}
