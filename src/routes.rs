use actix_cors::Cors;
use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};

use crate::auth::handlers::{authenticate, register};
use crate::config::CorsConfig;
use crate::error::AppError;
use crate::health_check;
use crate::posts::handlers::{create_post, get_posts};

/// Registers every endpoint. Shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health_check))
        .service(
            web::resource("/create_user")
                .route(web::post().to(register))
                .default_service(web::route().to(HttpResponse::NotFound)),
        )
        .service(
            web::resource("/authenticate")
                .route(web::post().to(authenticate))
                .default_service(web::route().to(HttpResponse::NotFound)),
        )
        .service(
            web::resource("/create_post")
                .route(web::post().to(create_post))
                .default_service(web::route().to(HttpResponse::NotFound)),
        )
        .service(
            web::resource("/get_posts")
                .route(web::get().to(get_posts))
                .default_service(web::route().to(HttpResponse::NotFound)),
        );
}

/// Malformed request bodies are reported in the JSON envelope as `bad_request`.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::ValidationError(format!("Failed to parse request: {}", err)).into()
}

pub fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
    };

    cors.max_age(config.max_age as usize)
}
