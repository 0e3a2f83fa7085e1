use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::response::ApiResponse;
use crate::AppState;
use crate::Result;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterData {
    pub name: String,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    info!("Received registration request for name: {}", req.name);
    let user = state.auth.register(&req.name, &req.password).await?;

    Ok(ApiResponse::ok(RegisterData { name: user.name }))
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthenticateData {
    pub name: String,
    pub access_token: String,
}

pub async fn authenticate(
    req: web::Json<AuthenticateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    info!("Received authentication request for name: {}", req.name);
    let issued = state.auth.authenticate(&req.name, &req.password).await?;

    Ok(ApiResponse::ok(AuthenticateData {
        name: issued.user.name,
        access_token: issued.session.access_token,
    }))
}
