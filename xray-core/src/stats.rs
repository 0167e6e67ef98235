//! Step-performance aggregation
//!
//! Every trace store flattens its steps into [`StepRecord`] rows and hands
//! them to [`aggregate_steps`], so grouping rules are identical whatever the
//! backend.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{Pipeline, PipelineStatus};
use crate::summary::{SUMMARY_CHARS, truncate};

/// Reasoning samples kept per group
pub const REASONING_SAMPLES: usize = 5;

/// A step joined with the attributes of its owning pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step_name: String,
    pub pipeline_type: String,
    pub pipeline_status: PipelineStatus,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    pub execution_time_ms: Option<f64>,
}

impl StepRecord {
    /// Flatten every step of a pipeline, in insertion order
    pub fn from_pipeline(pipeline: &Pipeline) -> impl Iterator<Item = StepRecord> + '_ {
        pipeline.steps.iter().map(|step| StepRecord {
            step_name: step.step_name.clone(),
            pipeline_type: pipeline.pipeline_type.clone(),
            pipeline_status: pipeline.status,
            reasoning: step.reasoning.clone(),
            timestamp: step.timestamp,
            execution_time_ms: step.execution_time_ms,
        })
    }
}

/// Aggregated performance of one `(step_name, pipeline_type)` group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub step_name: String,
    pub pipeline_type: String,
    /// Mean over steps that reported a timing; `0` if none did
    pub avg_execution_time_ms: f64,
    pub total_executions: u64,
    /// Percentage of the group's steps whose owning pipeline completed
    pub success_rate: f64,
    pub common_reasoning_patterns: Vec<String>,
}

#[derive(Default)]
struct Accumulator {
    timed_total: f64,
    timed_count: u64,
    executions: u64,
    completed: u64,
    reasoning: Vec<String>,
}

/// Group records by `(step_name, pipeline_type)`.
///
/// Groups come back sorted by step name then pipeline type, at most `limit`
/// of them. Success is judged by the owning pipeline's status, counted once
/// per step.
pub fn aggregate_steps(records: impl IntoIterator<Item = StepRecord>, limit: usize) -> Vec<StepStats> {
    let mut groups: BTreeMap<(String, String), Accumulator> = BTreeMap::new();

    for record in records {
        let acc = groups
            .entry((record.step_name, record.pipeline_type))
            .or_default();
        acc.executions += 1;
        if let Some(ms) = record.execution_time_ms {
            acc.timed_total += ms;
            acc.timed_count += 1;
        }
        if record.pipeline_status == PipelineStatus::Completed {
            acc.completed += 1;
        }
        if acc.reasoning.len() < REASONING_SAMPLES {
            acc.reasoning.push(truncate(&record.reasoning, SUMMARY_CHARS));
        }
    }

    groups
        .into_iter()
        .take(limit)
        .map(|((step_name, pipeline_type), acc)| StepStats {
            step_name,
            pipeline_type,
            avg_execution_time_ms: if acc.timed_count > 0 {
                acc.timed_total / acc.timed_count as f64
            } else {
                0.0
            },
            total_executions: acc.executions,
            success_rate: acc.completed as f64 / acc.executions as f64 * 100.0,
            common_reasoning_patterns: acc.reasoning,
        })
        .collect()
}
