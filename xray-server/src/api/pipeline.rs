//! Pipeline API Handlers
//!
//! HTTP endpoints for ingesting, fetching and searching pipeline traces.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use xray_core::dto::query::SearchPipelines;
use xray_core::dto::response::PipelineResponse;
use xray_core::dto::trace::PipelineTrace;

use super::AppState;
use super::extract::{ApiJson, ApiQuery};
use crate::api::error::ApiResult;
use crate::service::{pipeline_service, query_service};

/// POST /api/v1/pipelines
/// Ingest the first snapshot of a pipeline
pub async fn create_pipeline(
    State(state): State<AppState>,
    ApiJson(trace): ApiJson<PipelineTrace>,
) -> ApiResult<Json<PipelineResponse>> {
    tracing::info!("Creating pipeline: {}", trace.pipeline_id);

    let pipeline = pipeline_service::create_pipeline(state.store.as_ref(), trace).await?;

    Ok(Json(pipeline.into()))
}

/// PUT /api/v1/pipelines/{pipeline_id}
/// Merge a resubmitted snapshot into an existing pipeline
pub async fn merge_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
    ApiJson(trace): ApiJson<PipelineTrace>,
) -> ApiResult<Json<PipelineResponse>> {
    tracing::debug!("Merging pipeline: {}", pipeline_id);

    let pipeline = pipeline_service::merge_pipeline(state.store.as_ref(), &pipeline_id, trace).await?;

    Ok(Json(pipeline.into()))
}

/// GET /api/v1/pipelines/{pipeline_id}
/// Get a pipeline with all steps and candidates
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> ApiResult<Json<PipelineResponse>> {
    let pipeline = pipeline_service::get_pipeline(state.store.as_ref(), &pipeline_id).await?;

    Ok(Json(pipeline.into()))
}

/// DELETE /api/v1/pipelines/{pipeline_id}
/// Delete a pipeline and everything recorded under it
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline: {}", pipeline_id);

    pipeline_service::delete_pipeline(state.store.as_ref(), &pipeline_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/pipelines/search
/// Search pipelines across type, status, dates, step names and elimination rate
pub async fn search_pipelines(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchPipelines>,
) -> ApiResult<Json<Vec<PipelineResponse>>> {
    let pipelines = query_service::search_pipelines(state.store.as_ref(), query).await?;

    Ok(Json(pipelines.into_iter().map(Into::into).collect()))
}
