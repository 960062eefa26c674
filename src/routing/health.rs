use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe; does not touch remote services
pub async fn health_check() -> impl IntoResponse {
    let health_info = json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(health_info))
}
