//! Pipeline domain types

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Metadata;
use super::candidate::Candidate;
use super::step::Step;
use crate::dto::trace::PipelineTrace;

/// One execution of a named pipeline type
///
/// Steps and candidates are kept in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Store-assigned identity, immutable
    pub id: Uuid,
    /// Producer-assigned identity, stable across batched updates
    pub pipeline_id: String,
    pub pipeline_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: PipelineStatus,
    pub final_result: Option<Value>,
    pub error_message: Option<String>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<Step>,
    pub candidates: Vec<Candidate>,
}

/// Pipeline execution status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
        }
    }

    /// Completed and failed pipelines carry an end time
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::Running)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(PipelineStatus::Running),
            "completed" => Ok(PipelineStatus::Completed),
            "failed" => Ok(PipelineStatus::Failed),
            other => Err(format!("unknown pipeline status: {other}")),
        }
    }
}

/// What a merge appended to the stored trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub appended_steps: usize,
    pub appended_candidates: usize,
}

impl Pipeline {
    /// Reconcile a full producer snapshot against this stored pipeline.
    ///
    /// Lifecycle fields are overwritten wholesale (last write wins). Steps and
    /// candidates are append-only: an incoming entry is kept only when no
    /// entry stored before this merge shares its timestamp. The two
    /// collections are deduplicated independently. Identity attributes
    /// (`pipeline_id`, `pipeline_type`, `start_time`) never change.
    pub fn merge_snapshot(&mut self, snapshot: PipelineTrace) -> MergeOutcome {
        self.end_time = snapshot.end_time;
        self.final_result = snapshot.final_result;
        self.status = snapshot.status;
        self.error_message = snapshot.error_message;
        self.metadata = snapshot.metadata;

        let seen_steps: HashSet<DateTime<Utc>> = self.steps.iter().map(|s| s.timestamp).collect();
        let before = self.steps.len();
        self.steps.extend(
            snapshot
                .steps
                .into_iter()
                .filter(|s| !seen_steps.contains(&s.timestamp))
                .map(Step::from),
        );

        let seen_candidates: HashSet<DateTime<Utc>> =
            self.candidates.iter().map(|c| c.timestamp).collect();
        let before_candidates = self.candidates.len();
        self.candidates.extend(
            snapshot
                .candidates
                .into_iter()
                .filter(|c| !seen_candidates.contains(&c.timestamp))
                .map(Candidate::from),
        );

        MergeOutcome {
            appended_steps: self.steps.len() - before,
            appended_candidates: self.candidates.len() - before_candidates,
        }
    }
}
