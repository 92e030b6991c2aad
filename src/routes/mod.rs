//! HTTP API consumed by the portal frontend

mod health;
mod records;
mod work_orders;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::odata::WorkOrderSearch;
use crate::rfc::RfcConnector;

pub use records::{SapRecord, SapResponse};
pub use work_orders::{DropdownOption, SearchFormData, WorkOrderSearchRequest, WorkOrderSearchResponse};

/// Collaborators shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub work_orders: Arc<dyn WorkOrderSearch>,
    pub rfc: Arc<dyn RfcConnector>,
}

/// Build the application router with CORS and request tracing.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/api", get(health::api_root))
        .route("/api/sap/records", get(records::list_records).post(records::create_record))
        .route(
            "/api/sap/records/{record_id}",
            get(records::get_record).put(records::update_record).delete(records::delete_record),
        )
        .route("/api/sap/work-orders/form-data", get(work_orders::form_data))
        .route("/api/sap/work-orders/search", post(work_orders::search))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(allowed_origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::HeaderName::from_static("x-requested-with"),
        ])
}

/// `*` echoes the request origin; a literal wildcard cannot carry credentials.
fn allow_origin(allowed_origins: &[String]) -> AllowOrigin {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return AllowOrigin::mirror_request();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    AllowOrigin::list(origins)
}

/// Handler failure rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, detail: detail.into() }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, detail: detail.into() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: rejection.status(), detail: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
