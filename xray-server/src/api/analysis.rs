//! Analysis API Handlers
//!
//! Cross-pipeline aggregates and the per-pipeline debug walkthrough.

use axum::{
    Json,
    extract::{Path, State},
};
use xray_core::dto::debug::DebugReport;
use xray_core::dto::query::{AnalyzeSteps, HighElimination};
use xray_core::dto::response::CandidateResponse;
use xray_core::stats::StepStats;

use super::AppState;
use super::extract::ApiQuery;
use crate::api::error::ApiResult;
use crate::service::{debug_service, query_service};

/// GET /api/v1/steps/analyze
/// Step performance grouped by step name and pipeline type
pub async fn analyze_steps(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnalyzeSteps>,
) -> ApiResult<Json<Vec<StepStats>>> {
    let stats = query_service::analyze_steps(state.store.as_ref(), query).await?;

    Ok(Json(stats))
}

/// GET /api/v1/candidates/high-elimination
/// Filtering events that removed at least `min_rate` percent of candidates
pub async fn high_elimination(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HighElimination>,
) -> ApiResult<Json<Vec<CandidateResponse>>> {
    let candidates = query_service::high_elimination(state.store.as_ref(), query).await?;

    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/debug/pipeline/{pipeline_id}
/// Step-by-step walkthrough with heuristic issue flags
pub async fn debug_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> ApiResult<Json<DebugReport>> {
    tracing::debug!("Debugging pipeline: {}", pipeline_id);

    let report = debug_service::debug_walkthrough(state.store.as_ref(), &pipeline_id).await?;

    Ok(Json(report))
}
