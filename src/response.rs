//! JSON envelopes shared by every endpoint.
//!
//! Success: `{"ok": true, "data": ...}`.
//! Failure: `{"ok": false, "error_code": ..., "error_message": ...}`.

use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> HttpResponse {
        HttpResponse::Ok().json(ApiResponse { ok: true, data })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error_code: &'static str,
    pub error_message: String,
}

/// Payload for endpoints that report success without data.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}
