use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use tracing::{error, warn};

use crate::response::ErrorResponse;

pub const BAD_REQUEST: &str = "bad_request";
pub const UNAUTHORIZED: &str = "unauthorized";
pub const INTERNAL_SERVER_ERROR: &str = "internal_server_error";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl AppError {
    /// Code surfaced to callers in the `error_code` field.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => BAD_REQUEST,
            AppError::AuthError(AuthError::NameTaken) => BAD_REQUEST,
            AppError::AuthError(AuthError::InvalidCredentials)
            | AppError::AuthError(AuthError::InvalidToken) => UNAUTHORIZED,
            _ => INTERNAL_SERVER_ERROR,
        }
    }

    /// Message surfaced to callers. Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) => msg.clone(),
            AppError::AuthError(AuthError::NameTaken) => "name is already taken".to_string(),
            AppError::AuthError(AuthError::InvalidCredentials) => {
                "name or password is incorrect".to_string()
            }
            AppError::AuthError(AuthError::InvalidToken) => "Failed to authenticate".to_string(),
            _ => "internal server error".to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

// Logical failures travel in the body; the transport status is always 200.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_code = self.error_code();
        if error_code == INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, error_code, "request rejected");
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            ok: false,
            error_code,
            error_message: self.public_message(),
        })
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Name already taken")]
    NameTaken,

    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("Could not issue a unique access token after {attempts} attempts")]
    TokenIssuanceExhausted { attempts: u32 },

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

impl DatabaseError {
    /// True when the backend rejected an insert because of a unique constraint.
    /// Each backend is responsible for producing `Duplicate` from its own
    /// error representation.
    pub fn is_uniqueness_violation(&self) -> bool {
        matches!(self, DatabaseError::Duplicate(_))
    }
}
