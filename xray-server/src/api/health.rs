//! Health Check API Handlers
//!
//! Simple liveness endpoints for monitoring.

use axum::{Json, response::IntoResponse};

fn banner() -> serde_json::Value {
    serde_json::json!({
        "message": "X-Ray API is running",
        "version": env!("CARGO_PKG_VERSION"),
    })
}

/// GET /
/// Service banner
pub async fn root() -> impl IntoResponse {
    Json(banner())
}

/// GET /health
/// Health check endpoint, answering with the same banner
pub async fn health_check() -> impl IntoResponse {
    Json(banner())
}
