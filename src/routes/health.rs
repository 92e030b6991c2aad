use axum::Json;
use serde_json::{json, Value};

pub(super) async fn root() -> Json<Value> {
    Json(json!({ "message": "SAP Portal API is running" }))
}

pub(super) async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "SAP Portal API" }))
}

/// Answers GET and HEAD so proxies probing `/api` do not log 404s.
pub(super) async fn api_root() -> Json<Value> {
    Json(json!({ "message": "SAP Portal API", "version": env!("CARGO_PKG_VERSION") }))
}
