//! Debug walkthrough report

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Metadata;
use crate::domain::pipeline::PipelineStatus;

/// Step-by-step narrative of one pipeline, annotated with heuristic flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugReport {
    pub pipeline_id: String,
    pub pipeline_type: String,
    pub status: PipelineStatus,
    pub final_result: Option<Value>,
    pub error_message: Option<String>,
    pub total_steps: usize,
    pub total_filtering_steps: usize,
    pub execution_summary: Vec<StepWalkthrough>,
    pub filtering_analysis: Vec<FilterWalkthrough>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepWalkthrough {
    /// 1-based position within the pipeline
    pub step_number: usize,
    pub step_name: String,
    pub execution_time_ms: Option<f64>,
    pub inputs_summary: Value,
    pub outputs_summary: Value,
    pub reasoning: String,
    pub potential_issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterWalkthrough {
    pub step_name: String,
    pub input_count: i64,
    pub output_count: i64,
    /// Rounded to two decimals
    pub elimination_rate: f64,
    pub filters_applied: Vec<String>,
    pub rejection_summary: Metadata,
    pub potential_issues: Vec<Issue>,
}

/// Heuristic flags raised by the debug analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    LongExecutionTime,
    ErrorInReasoning,
    EliminationRateTooHigh,
    EliminationRateTooLow,
}

impl Issue {
    pub fn message(&self) -> &'static str {
        match self {
            Issue::LongExecutionTime => "Long execution time",
            Issue::ErrorInReasoning => "Error mentioned in reasoning",
            Issue::EliminationRateTooHigh => {
                "Very high elimination rate - filters may be too strict"
            }
            Issue::EliminationRateTooLow => "Very low elimination rate - filters may be too loose",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
