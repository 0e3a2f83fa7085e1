use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::response::{ApiResponse, Empty};
use crate::AppState;
use crate::Result;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}

/// The body is decoded only after the bearer token resolves, so a request
/// with a bad token and a bad body is always `unauthorized`.
pub async fn create_post(
    AuthenticatedUser(user): AuthenticatedUser,
    payload: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let req: CreatePostRequest = serde_json::from_slice(&payload)
        .map_err(|e| AppError::ValidationError(format!("Failed to parse request: {}", e)))?;
    let post = state.posts.create_post(&user, &req.body).await?;
    info!(user_id = user.id, post_id = post.id, "Created post");

    Ok(ApiResponse::ok(Empty::default()))
}

#[derive(Debug, Serialize)]
pub struct PostInResponse {
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostsData {
    pub posts: Vec<PostInResponse>,
}

pub async fn get_posts(
    AuthenticatedUser(user): AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let posts = state
        .posts
        .list_posts(&user)
        .await?
        .into_iter()
        .map(|post| PostInResponse {
            body: post.body,
            created_at: post.created_at,
        })
        .collect();

    Ok(ApiResponse::ok(PostsData { posts }))
}
