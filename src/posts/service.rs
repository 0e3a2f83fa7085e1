use chrono::Utc;
use std::sync::Arc;

use crate::config::PostsConfig;
use crate::db::models::{Post, User};
use crate::db::store::PostStore;
use crate::error::AppError;
use crate::Result;

pub struct PostService {
    posts: Arc<dyn PostStore>,
    config: PostsConfig,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>, config: PostsConfig) -> Self {
        Self { posts, config }
    }

    pub async fn create_post(&self, author: &User, body: &str) -> Result<Post> {
        if body.trim().is_empty() {
            return Err(AppError::ValidationError("body must not be empty".into()));
        }
        if body.chars().count() > self.config.max_body_chars {
            return Err(AppError::ValidationError(format!(
                "body must be at most {} characters",
                self.config.max_body_chars
            )));
        }

        Ok(self.posts.create_post(author.id, body, Utc::now()).await?)
    }

    /// Exactly the author's own posts, oldest first.
    pub async fn list_posts(&self, author: &User) -> Result<Vec<Post>> {
        Ok(self.posts.list_posts_by_user(author.id).await?)
    }
}
