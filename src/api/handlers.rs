use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

use crate::services::{PhotoLinkRequest, PhotoUpload, ServiceError};
use super::dto::{
    ErrorResponse, RegisterOrderRequest, RegisterOrderResponse, SearchRequest, SearchResponse,
    StatusQuery, UploadQuery, UploadResponse,
};
use super::presenter::{render_error_html, StatusView};
use super::server::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const DEFAULT_UPLOAD_FILENAME: &str = "foto";

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::from(self))
    }
}

/// POST /api/orders/search
pub async fn search_order(
    state: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, ServiceError> {
    let result = state.lookup.lookup(&body.email).await?;
    Ok(HttpResponse::Ok().json(SearchResponse::from(&result)))
}

/// POST /api/admin/photos
pub async fn upload_photo(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let query = query.into_inner();

    let content_type = header_value(&req, header::CONTENT_TYPE.as_str());
    let idempotency_key = header_value(&req, IDEMPOTENCY_KEY_HEADER);

    let request = PhotoLinkRequest {
        customer_email: query.email,
        order_number: query.order_number,
        photo: PhotoUpload {
            filename: query
                .filename
                .unwrap_or_else(|| DEFAULT_UPLOAD_FILENAME.to_string()),
            content_type,
            bytes: body.to_vec(),
        },
        idempotency_key,
        replace_existing: query.replace,
    };

    let result = state.photo_link.link_photo(request).await?;
    Ok(HttpResponse::Ok().json(UploadResponse::from(result)))
}

/// POST /api/admin/orders
pub async fn register_order(
    state: web::Data<AppState>,
    body: web::Json<RegisterOrderRequest>,
) -> Result<HttpResponse, ServiceError> {
    let order_number = state
        .registration
        .register(&body.email, &body.order_number)
        .await?;

    Ok(HttpResponse::Created().json(RegisterOrderResponse {
        success: true,
        order_number: order_number.to_string(),
    }))
}

/// GET /photos/{order}/{file}
pub async fn serve_photo(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let (order, file) = path.into_inner();
    let reference = format!("/photos/{}/{}", order, file);

    match state.photos.get(&reference).await? {
        Some(photo) => {
            tracing::debug!(
                reference = %reference,
                original_filename = %photo.original_filename,
                stored_at = %photo.stored_at,
                "Serving photo"
            );
            Ok(HttpResponse::Ok()
                .content_type(photo.content_type)
                .body(photo.bytes))
        }
        None => Err(ServiceError::NotFound(format!("photo {}", reference))),
    }
}

/// GET /
pub async fn index() -> HttpResponse {
    html(StatusCode::OK, StatusView::SearchForm.render_html())
}

/// GET /status?email=
pub async fn status_page(state: web::Data<AppState>, query: web::Query<StatusQuery>) -> HttpResponse {
    let email = query.email.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return html(StatusCode::OK, StatusView::SearchForm.render_html());
    }

    match state.lookup.lookup(email).await {
        Ok(result) => html(StatusCode::OK, StatusView::from_result(&result).render_html()),
        Err(e) => html(e.status_code(), render_error_html(&e.user_message())),
    }
}

/// GET /health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let breaker = state.photo_link.breaker_state().await;

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "petloo-tracker",
        "photoStorageCircuit": breaker.as_str(),
    }))
}

fn header_value(req: &HttpRequest, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(ContentType::html())
        .body(body)
}
