//! Trace snapshots sent by producers
//!
//! A producer always sends its whole in-memory trace, both on the first
//! write (Create) and on every later batch flush (Merge).

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::Metadata;
use crate::domain::candidate::Candidate;
use crate::domain::pipeline::{Pipeline, PipelineStatus};
use crate::domain::step::Step;

/// Full snapshot of a pipeline trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineTrace {
    pub pipeline_id: String,
    pub pipeline_type: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub final_result: Option<Value>,
    #[serde(default)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub steps: Vec<StepTrace>,
    #[serde(default)]
    pub candidates: Vec<CandidateTrace>,
}

/// A captured step, as sent by a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTrace {
    pub step_name: String,
    #[serde(default)]
    pub inputs: Value,
    #[serde(default)]
    pub outputs: Value,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub execution_time_ms: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A captured filtering event, as sent by a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrace {
    pub step_name: String,
    pub input_count: i64,
    pub output_count: i64,
    #[serde(default)]
    pub filters_applied: Vec<String>,
    #[serde(default)]
    pub sample_rejections: Metadata,
    #[serde(default)]
    pub sample_accepted: Vec<Value>,
    #[serde(default)]
    pub sample_rejected: Vec<Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PipelineTrace {
    /// Build a freshly stored pipeline from this snapshot
    pub fn into_pipeline(self, created_at: DateTime<Utc>) -> Pipeline {
        Pipeline {
            id: Uuid::new_v4(),
            pipeline_id: self.pipeline_id,
            pipeline_type: self.pipeline_type,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            final_result: self.final_result,
            error_message: self.error_message,
            metadata: self.metadata,
            created_at,
            steps: self.steps.into_iter().map(Step::from).collect(),
            candidates: self.candidates.into_iter().map(Candidate::from).collect(),
        }
    }

    /// Truncate every timestamp to microseconds.
    ///
    /// Postgres keeps `TIMESTAMPTZ` at microsecond precision, so the merge
    /// key has to be compared at that precision regardless of backend.
    pub fn normalize_timestamps(&mut self) {
        self.start_time = self.start_time.trunc_subsecs(6);
        self.end_time = self.end_time.map(|t| t.trunc_subsecs(6));
        for step in &mut self.steps {
            step.timestamp = step.timestamp.trunc_subsecs(6);
        }
        for candidate in &mut self.candidates {
            candidate.timestamp = candidate.timestamp.trunc_subsecs(6);
        }
    }
}

impl From<StepTrace> for Step {
    fn from(trace: StepTrace) -> Self {
        Step {
            id: Uuid::new_v4(),
            step_name: trace.step_name,
            inputs: trace.inputs,
            outputs: trace.outputs,
            reasoning: trace.reasoning,
            timestamp: trace.timestamp,
            execution_time_ms: trace.execution_time_ms,
            metadata: trace.metadata,
        }
    }
}

impl From<CandidateTrace> for Candidate {
    fn from(trace: CandidateTrace) -> Self {
        Candidate {
            id: Uuid::new_v4(),
            step_name: trace.step_name,
            input_count: trace.input_count,
            output_count: trace.output_count,
            filters_applied: trace.filters_applied,
            sample_rejections: trace.sample_rejections,
            sample_accepted: trace.sample_accepted,
            sample_rejected: trace.sample_rejected,
            timestamp: trace.timestamp,
            metadata: trace.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_snapshot_defaults_when_deserializing() {
        let trace: PipelineTrace = serde_json::from_value(json!({
            "pipeline_id": "p-1",
            "pipeline_type": "categorization",
            "start_time": "2025-03-01T10:00:00Z",
            "candidates": [{
                "step_name": "filter",
                "input_count": 100,
                "output_count": 10,
                "timestamp": "2025-03-01T10:00:01Z"
            }]
        }))
        .unwrap();

        assert_eq!(trace.status, PipelineStatus::Running);
        assert!(trace.steps.is_empty());
        assert!(trace.final_result.is_none());
        assert!(trace.candidates[0].filters_applied.is_empty());
    }

    #[test]
    fn test_normalize_truncates_to_microseconds() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let precise = base + chrono::Duration::nanoseconds(1_234_567);
        let mut trace = PipelineTrace {
            pipeline_id: "p-1".to_string(),
            pipeline_type: "categorization".to_string(),
            start_time: precise,
            end_time: None,
            final_result: None,
            status: PipelineStatus::Running,
            error_message: None,
            metadata: Metadata::new(),
            steps: vec![StepTrace {
                step_name: "s".to_string(),
                inputs: Value::Null,
                outputs: Value::Null,
                reasoning: "r".to_string(),
                timestamp: precise,
                execution_time_ms: None,
                metadata: Metadata::new(),
            }],
            candidates: vec![],
        };

        trace.normalize_timestamps();

        let expected = base + chrono::Duration::microseconds(1_234);
        assert_eq!(trace.start_time, expected);
        assert_eq!(trace.steps[0].timestamp, expected);
    }

    #[test]
    fn test_into_pipeline_keeps_order() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let trace = PipelineTrace {
            pipeline_id: "p-2".to_string(),
            pipeline_type: "categorization".to_string(),
            start_time: ts,
            end_time: None,
            final_result: None,
            status: PipelineStatus::Running,
            error_message: None,
            metadata: Metadata::new(),
            steps: ["first", "second", "third"]
                .iter()
                .enumerate()
                .map(|(i, name)| StepTrace {
                    step_name: name.to_string(),
                    inputs: Value::Null,
                    outputs: Value::Null,
                    reasoning: "r".to_string(),
                    timestamp: ts + chrono::Duration::seconds(i as i64),
                    execution_time_ms: None,
                    metadata: Metadata::new(),
                })
                .collect(),
            candidates: vec![],
        };

        let pipeline = trace.into_pipeline(ts);
        let names: Vec<_> = pipeline.steps.iter().map(|s| s.step_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
