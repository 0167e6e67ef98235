//! Repository Module
//!
//! Data access layer for recorded traces.
//! A [`TraceStore`] owns Pipelines together with their Steps and Candidates.
//! Every write runs atomically, and concurrent writes to the same pipeline
//! are serialised so the merge dedup check always sees a consistent prior
//! state.

pub mod memory;
pub mod postgres;

pub use memory::MemoryTraceStore;
pub use postgres::PgTraceStore;

use async_trait::async_trait;
use thiserror::Error;
use xray_core::domain::candidate::Candidate;
use xray_core::domain::pipeline::{MergeOutcome, Pipeline};
use xray_core::dto::query::{AnalyzeSteps, SearchPipelines};
use xray_core::dto::trace::PipelineTrace;
use xray_core::stats::StepStats;

/// Storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// A pipeline with this `pipeline_id` is already stored
    #[error("pipeline {0} already exists")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back to a domain value
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Persistence contract for pipeline traces
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Persist a new pipeline with its initial steps and candidates
    async fn create(&self, trace: PipelineTrace) -> Result<Pipeline, StoreError>;

    /// Find a pipeline by its producer-assigned id
    async fn get(&self, pipeline_id: &str) -> Result<Option<Pipeline>, StoreError>;

    /// Reconcile a full snapshot against the stored pipeline.
    ///
    /// Returns `None` when the pipeline does not exist; merge never creates.
    async fn merge(
        &self,
        pipeline_id: &str,
        snapshot: PipelineTrace,
    ) -> Result<Option<(Pipeline, MergeOutcome)>, StoreError>;

    /// Delete a pipeline together with its steps and candidates
    async fn delete(&self, pipeline_id: &str) -> Result<bool, StoreError>;

    /// Pipelines matching every filter, newest `start_time` first, paginated
    async fn search(&self, query: &SearchPipelines) -> Result<Vec<Pipeline>, StoreError>;

    /// Step statistics grouped by `(step_name, pipeline_type)`
    async fn aggregate_steps(&self, query: &AnalyzeSteps) -> Result<Vec<StepStats>, StoreError>;

    /// Every candidate across all pipelines whose elimination rate is at
    /// least `min_rate`
    async fn scan_candidates(&self, min_rate: f64) -> Result<Vec<Candidate>, StoreError>;
}
