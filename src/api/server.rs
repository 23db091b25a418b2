use std::sync::Arc;
use actix_web::error::InternalError;
use actix_web::{web, App, HttpResponse, HttpServer};

use crate::services::{OrderLookupService, OrderRegistrationService, PhotoLinkService, PhotoStorage};
use super::dto::ErrorResponse;
use super::handlers;

/// Services shared by every worker
pub struct AppState {
    pub lookup: OrderLookupService,
    pub photo_link: PhotoLinkService,
    pub registration: OrderRegistrationService,
    pub photos: Arc<dyn PhotoStorage>,
}

/// Register all public routes.
///
/// `max_photo_bytes` bounds the raw upload body; larger bodies are refused
/// with 413 before reaching the handler.
pub fn configure(cfg: &mut web::ServiceConfig, max_photo_bytes: usize) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/", web::get().to(handlers::index))
        .route("/status", web::get().to(handlers::status_page))
        .route("/health", web::get().to(handlers::health))
        .route("/photos/{order}/{file}", web::get().to(handlers::serve_photo))
        .service(
            web::scope("/api")
                .route("/orders/search", web::post().to(handlers::search_order))
                .route("/admin/orders", web::post().to(handlers::register_order))
                .service(
                    web::resource("/admin/photos")
                        .app_data(web::PayloadConfig::new(max_photo_bytes))
                        .route(web::post().to(handlers::upload_photo)),
                ),
        );
}

/// Malformed JSON bodies get the same error envelope as service errors
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        InternalError::from_response(err, bad_request()).into()
    })
}

/// Missing or malformed query parameters, same envelope
fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        InternalError::from_response(err, bad_request()).into()
    })
}

fn bad_request() -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        success: false,
        error: "validation".to_string(),
        message: "Requisição inválida.".to_string(),
    })
}

/// Start the public HTTP server
pub async fn start_api_server(
    state: web::Data<AppState>,
    host: String,
    port: u16,
    max_photo_bytes: usize,
) -> std::io::Result<()> {
    tracing::info!("Starting API server on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(|cfg| configure(cfg, max_photo_bytes))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

// ============================================================================
// Handler Tests
// ============================================================================
