//! API Module
//!
//! HTTP API layer for the trace server.
//! Each submodule handles endpoints for a specific domain.

pub mod analysis;
pub mod error;
pub mod extract;
pub mod health;
pub mod pipeline;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::repository::TraceStore;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TraceStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TraceStore>) -> Self {
        Self { store }
    }
}

/// Create the main API router with all endpoints
///
/// Every request, store work included, is bounded by `request_timeout`.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health check
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/api/v1/pipelines", post(pipeline::create_pipeline))
        .route("/api/v1/pipelines/search", get(pipeline::search_pipelines))
        .route(
            "/api/v1/pipelines/{pipeline_id}",
            get(pipeline::get_pipeline)
                .put(pipeline::merge_pipeline)
                .delete(pipeline::delete_pipeline),
        )
        // Analysis endpoints
        .route("/api/v1/steps/analyze", get(analysis::analyze_steps))
        .route(
            "/api/v1/candidates/high-elimination",
            get(analysis::high_elimination),
        )
        .route(
            "/api/v1/debug/pipeline/{pipeline_id}",
            get(analysis::debug_pipeline),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}
