//! Wire responses carrying derived fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::Metadata;
use crate::domain::candidate::Candidate;
use crate::domain::pipeline::{Pipeline, PipelineStatus};
use crate::domain::step::Step;

/// A stored pipeline as returned to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub id: Uuid,
    pub pipeline_id: String,
    pub pipeline_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub final_result: Option<Value>,
    pub status: PipelineStatus,
    pub error_message: Option<String>,
    pub metadata: Metadata,
    pub steps: Vec<Step>,
    pub candidates: Vec<CandidateResponse>,
    pub created_at: DateTime<Utc>,
}

/// A candidate event together with its elimination rate, computed at
/// conversion time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResponse {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub elimination_rate: f64,
}

impl From<Candidate> for CandidateResponse {
    fn from(candidate: Candidate) -> Self {
        Self {
            elimination_rate: candidate.elimination_rate(),
            candidate,
        }
    }
}

impl From<Pipeline> for PipelineResponse {
    fn from(pipeline: Pipeline) -> Self {
        Self {
            id: pipeline.id,
            pipeline_id: pipeline.pipeline_id,
            pipeline_type: pipeline.pipeline_type,
            start_time: pipeline.start_time,
            end_time: pipeline.end_time,
            final_result: pipeline.final_result,
            status: pipeline.status,
            error_message: pipeline.error_message,
            metadata: pipeline.metadata,
            steps: pipeline.steps,
            candidates: pipeline.candidates.into_iter().map(Into::into).collect(),
            created_at: pipeline.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_response_serializes_rate_inline() {
        let candidate = Candidate {
            id: Uuid::nil(),
            step_name: "strict_filter".to_string(),
            input_count: 1000,
            output_count: 5,
            filters_applied: vec!["price".to_string()],
            sample_rejections: Metadata::new(),
            sample_accepted: vec![],
            sample_rejected: vec![],
            timestamp: "2025-01-01T00:00:00Z".parse().unwrap(),
            metadata: Metadata::new(),
        };

        let value = serde_json::to_value(CandidateResponse::from(candidate)).unwrap();

        assert_eq!(value["elimination_rate"], json!(99.5));
        assert_eq!(value["step_name"], json!("strict_filter"));
        assert_eq!(value["input_count"], json!(1000));
    }
}
