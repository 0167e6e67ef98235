//! Query parameters for searching and analysing traces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{Pipeline, PipelineStatus};
use crate::stats::StepRecord;

pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_MIN_ELIMINATION_RATE: f64 = 90.0;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_min_rate() -> f64 {
    DEFAULT_MIN_ELIMINATION_RATE
}

/// Multi-predicate pipeline search; all present filters must hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPipelines {
    #[serde(default)]
    pub pipeline_type: Option<String>,
    #[serde(default)]
    pub status: Option<PipelineStatus>,
    /// Inclusive lower bound on `start_time`
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `start_time`
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Pipeline has at least one step with this name
    #[serde(default)]
    pub step_name: Option<String>,
    /// Pipeline has at least one candidate at or above this rate
    #[serde(default)]
    pub min_elimination_rate: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Default for SearchPipelines {
    fn default() -> Self {
        Self {
            pipeline_type: None,
            status: None,
            start_date: None,
            end_date: None,
            step_name: None,
            min_elimination_rate: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl SearchPipelines {
    /// Evaluate every filter against a materialized pipeline.
    ///
    /// Ordering and pagination are not part of the predicate.
    pub fn matches(&self, pipeline: &Pipeline) -> bool {
        if let Some(pipeline_type) = &self.pipeline_type
            && pipeline.pipeline_type != *pipeline_type
        {
            return false;
        }
        if let Some(status) = self.status
            && pipeline.status != status
        {
            return false;
        }
        if let Some(start) = self.start_date
            && pipeline.start_time < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && pipeline.start_time > end
        {
            return false;
        }
        if let Some(step_name) = &self.step_name
            && !pipeline.steps.iter().any(|s| s.step_name == *step_name)
        {
            return false;
        }
        if let Some(min_rate) = self.min_elimination_rate
            && !pipeline
                .candidates
                .iter()
                .any(|c| c.elimination_rate() >= min_rate)
        {
            return false;
        }
        true
    }
}

/// Filters for cross-pipeline step aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSteps {
    #[serde(default)]
    pub step_name: Option<String>,
    #[serde(default)]
    pub pipeline_type: Option<String>,
    /// Inclusive lower bound on the step timestamp
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the step timestamp
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Minimum `execution_time_ms`; steps without a timing never qualify
    #[serde(default)]
    pub min_execution_time: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for AnalyzeSteps {
    fn default() -> Self {
        Self {
            step_name: None,
            pipeline_type: None,
            start_date: None,
            end_date: None,
            min_execution_time: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl AnalyzeSteps {
    pub fn matches(&self, record: &StepRecord) -> bool {
        if let Some(step_name) = &self.step_name
            && record.step_name != *step_name
        {
            return false;
        }
        if let Some(pipeline_type) = &self.pipeline_type
            && record.pipeline_type != *pipeline_type
        {
            return false;
        }
        if let Some(start) = self.start_date
            && record.timestamp < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && record.timestamp > end
        {
            return false;
        }
        if let Some(min) = self.min_execution_time {
            match record.execution_time_ms {
                Some(ms) if ms >= min => {}
                _ => return false,
            }
        }
        true
    }
}

/// Threshold for the cross-pipeline high-elimination scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighElimination {
    #[serde(default = "default_min_rate")]
    pub min_rate: f64,
}

impl Default for HighElimination {
    fn default() -> Self {
        Self {
            min_rate: DEFAULT_MIN_ELIMINATION_RATE,
        }
    }
}
