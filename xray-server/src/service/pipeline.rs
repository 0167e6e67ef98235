//! Pipeline Service
//!
//! Ingestion and point lookups for pipeline traces.

use xray_core::domain::pipeline::{Pipeline, PipelineStatus};
use xray_core::dto::trace::{CandidateTrace, PipelineTrace, StepTrace};

use super::{Result, ServiceError};
use crate::repository::TraceStore;

/// Record the first snapshot of a pipeline
pub async fn create_pipeline(store: &dyn TraceStore, mut trace: PipelineTrace) -> Result<Pipeline> {
    validate_pipeline_trace(&trace)?;
    trace.normalize_timestamps();

    let pipeline = store.create(trace).await?;

    tracing::info!(
        pipeline_id = %pipeline.pipeline_id,
        pipeline_type = %pipeline.pipeline_type,
        steps = pipeline.steps.len(),
        candidates = pipeline.candidates.len(),
        "Pipeline created"
    );

    Ok(pipeline)
}

/// Reconcile a resubmitted full snapshot against the stored pipeline
pub async fn merge_pipeline(
    store: &dyn TraceStore,
    pipeline_id: &str,
    mut trace: PipelineTrace,
) -> Result<Pipeline> {
    if trace.pipeline_id != pipeline_id {
        return Err(ServiceError::InvalidInput(format!(
            "Snapshot pipeline_id {} does not match {}",
            trace.pipeline_id, pipeline_id
        )));
    }
    validate_pipeline_trace(&trace)?;
    trace.normalize_timestamps();

    let (pipeline, outcome) = store
        .merge(pipeline_id, trace)
        .await?
        .ok_or_else(|| ServiceError::NotFound(pipeline_id.to_string()))?;

    tracing::info!(
        pipeline_id = %pipeline.pipeline_id,
        status = %pipeline.status,
        appended_steps = outcome.appended_steps,
        appended_candidates = outcome.appended_candidates,
        "Pipeline merged"
    );

    Ok(pipeline)
}

/// Get a pipeline with all its steps and candidates
pub async fn get_pipeline(store: &dyn TraceStore, pipeline_id: &str) -> Result<Pipeline> {
    tracing::debug!("Getting pipeline: {}", pipeline_id);

    store
        .get(pipeline_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(pipeline_id.to_string()))
}

/// Delete a pipeline and everything recorded under it
pub async fn delete_pipeline(store: &dyn TraceStore, pipeline_id: &str) -> Result<()> {
    let deleted = store.delete(pipeline_id).await?;

    if !deleted {
        return Err(ServiceError::NotFound(pipeline_id.to_string()));
    }

    tracing::info!("Pipeline deleted: {}", pipeline_id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_pipeline_trace(trace: &PipelineTrace) -> Result<()> {
    if trace.pipeline_id.trim().is_empty() {
        return Err(invalid("pipeline_id cannot be empty"));
    }

    if trace.pipeline_type.trim().is_empty() {
        return Err(invalid("pipeline_type cannot be empty"));
    }

    if trace.end_time.is_some() != trace.status.is_terminal() {
        return Err(invalid(&format!(
            "end_time must be set exactly when the pipeline has finished (status: {})",
            trace.status
        )));
    }

    if trace.error_message.is_some() && trace.status != PipelineStatus::Failed {
        return Err(invalid("error_message is only allowed on failed pipelines"));
    }

    if trace.final_result.is_some() && !trace.status.is_terminal() {
        return Err(invalid("final_result is only allowed once the pipeline has finished"));
    }

    for (i, step) in trace.steps.iter().enumerate() {
        validate_step(i, step)?;
    }

    for (i, candidate) in trace.candidates.iter().enumerate() {
        validate_candidate(i, candidate)?;
    }

    Ok(())
}

fn validate_step(index: usize, step: &StepTrace) -> Result<()> {
    if step.step_name.trim().is_empty() {
        return Err(invalid(&format!("steps[{index}]: step_name cannot be empty")));
    }

    if step.reasoning.trim().is_empty() {
        return Err(invalid(&format!(
            "steps[{index}] ({}): reasoning cannot be empty",
            step.step_name
        )));
    }

    if let Some(ms) = step.execution_time_ms
        && !(ms.is_finite() && ms >= 0.0)
    {
        return Err(invalid(&format!(
            "steps[{index}] ({}): execution_time_ms must be a non-negative number",
            step.step_name
        )));
    }

    Ok(())
}

fn validate_candidate(index: usize, candidate: &CandidateTrace) -> Result<()> {
    if candidate.step_name.trim().is_empty() {
        return Err(invalid(&format!(
            "candidates[{index}]: step_name cannot be empty"
        )));
    }

    // output_count > input_count is accepted; it shows up as a negative rate.
    if candidate.input_count < 0 || candidate.output_count < 0 {
        return Err(invalid(&format!(
            "candidates[{index}] ({}): counts cannot be negative",
            candidate.step_name
        )));
    }

    Ok(())
}

fn invalid(message: &str) -> ServiceError {
    ServiceError::InvalidInput(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use xray_core::domain::Metadata;

    fn trace() -> PipelineTrace {
        PipelineTrace {
            pipeline_id: "p-1".to_string(),
            pipeline_type: "competitor_selection".to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end_time: None,
            final_result: None,
            status: PipelineStatus::Running,
            error_message: None,
            metadata: Metadata::new(),
            steps: vec![StepTrace {
                step_name: "keyword_generation".to_string(),
                inputs: json!({"title": "phone case"}),
                outputs: json!({"keywords": ["case"]}),
                reasoning: "Extracted product nouns".to_string(),
                timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap(),
                execution_time_ms: Some(40.0),
                metadata: Metadata::new(),
            }],
            candidates: vec![CandidateTrace {
                step_name: "filter".to_string(),
                input_count: 10,
                output_count: 4,
                filters_applied: vec![],
                sample_rejections: Metadata::new(),
                sample_accepted: vec![],
                sample_rejected: vec![],
                timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 2).unwrap(),
                metadata: Metadata::new(),
            }],
        }
    }

    #[test]
    fn test_validate_valid_trace() {
        assert!(validate_pipeline_trace(&trace()).is_ok());
    }

    #[test]
    fn test_validate_empty_reasoning() {
        let mut t = trace();
        t.steps[0].reasoning = "   ".to_string();
        assert!(matches!(
            validate_pipeline_trace(&t),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_empty_pipeline_type() {
        let mut t = trace();
        t.pipeline_type = String::new();
        assert!(matches!(
            validate_pipeline_trace(&t),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_negative_counts() {
        let mut t = trace();
        t.candidates[0].output_count = -1;
        assert!(matches!(
            validate_pipeline_trace(&t),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_accepts_output_above_input() {
        let mut t = trace();
        t.candidates[0].output_count = 50;
        assert!(validate_pipeline_trace(&t).is_ok());
    }

    #[test]
    fn test_validate_negative_execution_time() {
        let mut t = trace();
        t.steps[0].execution_time_ms = Some(-3.0);
        assert!(validate_pipeline_trace(&t).is_err());
        t.steps[0].execution_time_ms = Some(f64::NAN);
        assert!(validate_pipeline_trace(&t).is_err());
        t.steps[0].execution_time_ms = None;
        assert!(validate_pipeline_trace(&t).is_ok());
    }

    #[test]
    fn test_validate_lifecycle_consistency() {
        let mut running_with_end = trace();
        running_with_end.end_time = Some(Utc::now());
        assert!(validate_pipeline_trace(&running_with_end).is_err());

        let mut completed_without_end = trace();
        completed_without_end.status = PipelineStatus::Completed;
        assert!(validate_pipeline_trace(&completed_without_end).is_err());

        let mut completed_with_error = trace();
        completed_with_error.status = PipelineStatus::Completed;
        completed_with_error.end_time = Some(Utc::now());
        completed_with_error.error_message = Some("boom".to_string());
        assert!(validate_pipeline_trace(&completed_with_error).is_err());

        let mut running_with_result = trace();
        running_with_result.final_result = Some(json!("early"));
        assert!(validate_pipeline_trace(&running_with_result).is_err());

        let mut failed = trace();
        failed.status = PipelineStatus::Failed;
        failed.end_time = Some(Utc::now());
        failed.error_message = Some("LLM timeout".to_string());
        assert!(validate_pipeline_trace(&failed).is_ok());
    }
}
