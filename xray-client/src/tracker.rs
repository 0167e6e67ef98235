//! In-process trace capture
//!
//! A [`Tracker`] accumulates one pipeline run in memory and sends the full
//! snapshot on every [`Tracker::flush`]. The server deduplicates steps and
//! candidates by timestamp, so flushing repeatedly is safe.

use std::time::Instant;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::{Value, json};
use uuid::Uuid;
use xray_core::domain::Metadata;
use xray_core::domain::pipeline::PipelineStatus;
use xray_core::dto::response::PipelineResponse;
use xray_core::dto::trace::{CandidateTrace, PipelineTrace, StepTrace};

use crate::XRayClient;
use crate::error::Result;

/// Captures the steps and filtering events of one pipeline run
#[derive(Debug)]
pub struct Tracker {
    trace: PipelineTrace,
    last_capture: Instant,
    last_timestamp: DateTime<Utc>,
    created: bool,
}

impl Tracker {
    /// Start tracking a new run with a generated pipeline id
    pub fn new(pipeline_type: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), pipeline_type)
    }

    /// Start tracking a run under a caller-chosen pipeline id
    pub fn with_id(pipeline_id: impl Into<String>, pipeline_type: impl Into<String>) -> Self {
        let start_time = Utc::now().trunc_subsecs(6);

        Self {
            trace: PipelineTrace {
                pipeline_id: pipeline_id.into(),
                pipeline_type: pipeline_type.into(),
                start_time,
                end_time: None,
                final_result: None,
                status: PipelineStatus::Running,
                error_message: None,
                metadata: Metadata::new(),
                steps: Vec::new(),
                candidates: Vec::new(),
            },
            last_capture: Instant::now(),
            last_timestamp: start_time,
            created: false,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.trace.pipeline_id
    }

    /// The snapshot that the next flush would send
    pub fn snapshot(&self) -> &PipelineTrace {
        &self.trace
    }

    /// Record a step; its execution time is the wall-clock time since the
    /// previous step was captured (or since the tracker started)
    pub fn capture_step(
        &mut self,
        step_name: impl Into<String>,
        inputs: Value,
        outputs: Value,
        reasoning: impl Into<String>,
    ) -> &mut StepTrace {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_capture);
        self.last_capture = now;

        let timestamp = self.next_timestamp();
        self.trace.steps.push(StepTrace {
            step_name: step_name.into(),
            inputs,
            outputs,
            reasoning: reasoning.into(),
            timestamp,
            execution_time_ms: Some(elapsed.as_secs_f64() * 1000.0),
            metadata: Metadata::new(),
        });

        let index = self.trace.steps.len() - 1;
        &mut self.trace.steps[index]
    }

    /// Record a filtering event; samples can be attached to the returned entry
    pub fn capture_candidates(
        &mut self,
        step_name: impl Into<String>,
        input_count: i64,
        output_count: i64,
        filters_applied: Vec<String>,
    ) -> &mut CandidateTrace {
        let timestamp = self.next_timestamp();
        self.trace.candidates.push(CandidateTrace {
            step_name: step_name.into(),
            input_count,
            output_count,
            filters_applied,
            sample_rejections: Metadata::new(),
            sample_accepted: Vec::new(),
            sample_rejected: Vec::new(),
            timestamp,
            metadata: Metadata::new(),
        });

        let index = self.trace.candidates.len() - 1;
        &mut self.trace.candidates[index]
    }

    /// Record a decision as a `<step>_reasoning` step
    pub fn capture_reasoning(
        &mut self,
        step_name: &str,
        decision: impl Into<String>,
        reasoning: impl Into<String>,
        confidence: Option<f64>,
        alternatives_considered: Vec<Value>,
    ) -> &mut StepTrace {
        let decision = decision.into();
        let reasoning = reasoning.into();

        let record = json!({
            "decision": decision,
            "reasoning": reasoning,
            "confidence": confidence,
            "alternatives_considered": alternatives_considered,
        });

        let step = self.capture_step(
            format!("{step_name}_reasoning"),
            json!({ "alternatives": alternatives_considered }),
            json!({ "decision": decision, "confidence": confidence }),
            reasoning,
        );
        step.metadata.insert("reasoning_data".to_string(), record);
        step
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.trace.metadata.insert(key.into(), value);
    }

    /// Mark the run completed
    pub fn complete(&mut self, final_result: Value) {
        self.trace.end_time = Some(self.next_timestamp());
        self.trace.status = PipelineStatus::Completed;
        self.trace.final_result = Some(final_result);
        self.trace.error_message = None;
    }

    /// Mark the run failed
    pub fn fail(&mut self, error_message: impl Into<String>) {
        self.trace.end_time = Some(self.next_timestamp());
        self.trace.status = PipelineStatus::Failed;
        self.trace.error_message = Some(error_message.into());
        self.trace.final_result = None;
    }

    /// Send the current snapshot: create on the first flush, merge afterwards
    pub async fn flush(&mut self, client: &XRayClient) -> Result<PipelineResponse> {
        let pipeline = if self.created {
            client
                .merge_pipeline(&self.trace.pipeline_id, &self.trace)
                .await?
        } else {
            let pipeline = client.create_pipeline(&self.trace).await?;
            self.created = true;
            pipeline
        };

        tracing::debug!(
            pipeline_id = %pipeline.pipeline_id,
            steps = pipeline.steps.len(),
            candidates = pipeline.candidates.len(),
            "Trace flushed"
        );

        Ok(pipeline)
    }

    /// Timestamps are unique per tracker at microsecond precision, since the
    /// server treats an equal timestamp as an already-recorded entry
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let timestamp = if now > self.last_timestamp {
            now
        } else {
            self.last_timestamp + Duration::microseconds(1)
        };
        self.last_timestamp = timestamp;
        timestamp
    }
}
