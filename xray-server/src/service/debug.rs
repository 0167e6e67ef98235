//! Debug Service
//!
//! Turns one pipeline's full trace into a walkthrough annotated with
//! heuristic issue flags.

use xray_core::domain::candidate::Candidate;
use xray_core::domain::pipeline::Pipeline;
use xray_core::domain::step::Step;
use xray_core::dto::debug::{DebugReport, FilterWalkthrough, Issue, StepWalkthrough};
use xray_core::summary::summarize;

use super::Result;
use super::pipeline_service;
use crate::repository::TraceStore;

/// Steps slower than this are flagged
pub const LONG_EXECUTION_MS: f64 = 5000.0;

/// Filters eliminating more than this percentage are flagged as too strict
pub const HIGH_ELIMINATION_RATE: f64 = 95.0;

/// Filters eliminating less than this percentage are flagged as too loose
pub const LOW_ELIMINATION_RATE: f64 = 10.0;

const ERROR_MARKERS: [&str; 2] = ["error", "fail"];

/// Build the debug walkthrough for a stored pipeline
pub async fn debug_walkthrough(store: &dyn TraceStore, pipeline_id: &str) -> Result<DebugReport> {
    let pipeline = pipeline_service::get_pipeline(store, pipeline_id).await?;
    Ok(analyze(&pipeline))
}

/// Walk a materialized pipeline step by step
pub fn analyze(pipeline: &Pipeline) -> DebugReport {
    DebugReport {
        pipeline_id: pipeline.pipeline_id.clone(),
        pipeline_type: pipeline.pipeline_type.clone(),
        status: pipeline.status,
        final_result: pipeline.final_result.clone(),
        error_message: pipeline.error_message.clone(),
        total_steps: pipeline.steps.len(),
        total_filtering_steps: pipeline.candidates.len(),
        execution_summary: pipeline
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| walk_step(i + 1, step))
            .collect(),
        filtering_analysis: pipeline.candidates.iter().map(walk_filter).collect(),
    }
}

fn walk_step(step_number: usize, step: &Step) -> StepWalkthrough {
    StepWalkthrough {
        step_number,
        step_name: step.step_name.clone(),
        execution_time_ms: step.execution_time_ms,
        inputs_summary: summarize(&step.inputs),
        outputs_summary: summarize(&step.outputs),
        reasoning: step.reasoning.clone(),
        potential_issues: step_issues(step),
    }
}

fn walk_filter(candidate: &Candidate) -> FilterWalkthrough {
    let rate = candidate.elimination_rate();

    FilterWalkthrough {
        step_name: candidate.step_name.clone(),
        input_count: candidate.input_count,
        output_count: candidate.output_count,
        elimination_rate: round2(rate),
        filters_applied: candidate.filters_applied.clone(),
        rejection_summary: candidate.sample_rejections.clone(),
        potential_issues: filter_issues(rate),
    }
}

fn step_issues(step: &Step) -> Vec<Issue> {
    let mut issues = Vec::new();

    if step
        .execution_time_ms
        .is_some_and(|ms| ms > LONG_EXECUTION_MS)
    {
        issues.push(Issue::LongExecutionTime);
    }

    let reasoning = step.reasoning.to_lowercase();
    if ERROR_MARKERS.iter().any(|marker| reasoning.contains(marker)) {
        issues.push(Issue::ErrorInReasoning);
    }

    issues
}

/// Flags are judged on the unrounded rate
fn filter_issues(rate: f64) -> Vec<Issue> {
    if rate > HIGH_ELIMINATION_RATE {
        vec![Issue::EliminationRateTooHigh]
    } else if rate < LOW_ELIMINATION_RATE {
        vec![Issue::EliminationRateTooLow]
    } else {
        Vec::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;
    use xray_core::domain::Metadata;
    use xray_core::domain::pipeline::PipelineStatus;

    fn step(reasoning: &str, ms: Option<f64>) -> Step {
        Step {
            id: Uuid::new_v4(),
            step_name: "llm_ranking".to_string(),
            inputs: json!({"candidates": 12}),
            outputs: json!({"winner": "B0001"}),
            reasoning: reasoning.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            execution_time_ms: ms,
            metadata: Metadata::new(),
        }
    }

    fn candidate(input: i64, output: i64) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            step_name: "price_filter".to_string(),
            input_count: input,
            output_count: output,
            filters_applied: vec!["price_range".to_string()],
            sample_rejections: Metadata::from_iter([("too_expensive".to_string(), json!(40))]),
            sample_accepted: vec![],
            sample_rejected: vec![],
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_long_execution_flag() {
        assert_eq!(step_issues(&step("ok", Some(6000.0))), vec![Issue::LongExecutionTime]);
        assert!(step_issues(&step("ok", Some(5000.0))).is_empty());
        assert!(step_issues(&step("ok", None)).is_empty());
    }

    #[test]
    fn test_error_in_reasoning_is_case_insensitive() {
        assert_eq!(
            step_issues(&step("Upstream API returned an ERROR", None)),
            vec![Issue::ErrorInReasoning]
        );
        assert_eq!(
            step_issues(&step("Validation Failed twice", Some(7000.0))),
            vec![Issue::LongExecutionTime, Issue::ErrorInReasoning]
        );
        assert!(step_issues(&step("Ranked by relevance", None)).is_empty());
    }

    #[test]
    fn test_filter_flags() {
        // 98% elimination
        assert_eq!(filter_issues(candidate(100, 2).elimination_rate()), vec![Issue::EliminationRateTooHigh]);
        assert_eq!(filter_issues(candidate(100, 95).elimination_rate()), vec![Issue::EliminationRateTooLow]);
        assert!(filter_issues(candidate(100, 50).elimination_rate()).is_empty());
        // Boundaries are exclusive.
        assert!(filter_issues(95.0).is_empty());
        assert!(filter_issues(10.0).is_empty());
        // Zero input means a zero rate, which reads as too loose.
        assert_eq!(filter_issues(candidate(0, 0).elimination_rate()), vec![Issue::EliminationRateTooLow]);
    }

    #[test]
    fn test_report_structure() {
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            pipeline_id: "debug-1".to_string(),
            pipeline_type: "competitor_selection".to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end_time: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 0).unwrap()),
            status: PipelineStatus::Completed,
            final_result: Some(json!({"asin": "B0001"})),
            error_message: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
            steps: vec![step("first", Some(10.0)), step("second", Some(6000.0))],
            candidates: vec![candidate(3, 1)],
        };

        let report = analyze(&pipeline);

        assert_eq!(report.total_steps, 2);
        assert_eq!(report.total_filtering_steps, 1);
        assert_eq!(report.final_result, Some(json!({"asin": "B0001"})));
        let numbers: Vec<_> = report.execution_summary.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(report.execution_summary[1].potential_issues, vec![Issue::LongExecutionTime]);
        assert_eq!(report.execution_summary[0].inputs_summary, json!({"candidates": 12}));
        // 66.666...% rounds to two decimals
        assert_eq!(report.filtering_analysis[0].elimination_rate, 66.67);
        assert_eq!(report.filtering_analysis[0].rejection_summary["too_expensive"], json!(40));
    }
}
