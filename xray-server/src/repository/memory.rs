//! In-memory trace store
//!
//! Keeps every pipeline behind a single lock. Writers hold the write lock for
//! the whole operation, which makes each create/merge/delete atomic and
//! serialises merges of the same pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tokio::sync::RwLock;
use xray_core::domain::candidate::Candidate;
use xray_core::domain::pipeline::{MergeOutcome, Pipeline};
use xray_core::dto::query::{AnalyzeSteps, SearchPipelines};
use xray_core::dto::trace::PipelineTrace;
use xray_core::stats::{StepRecord, StepStats, aggregate_steps};

use super::{StoreError, TraceStore};

/// Trace store backed by process memory
#[derive(Default)]
pub struct MemoryTraceStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    pipelines: HashMap<String, Entry>,
    next_seq: u64,
}

struct Entry {
    /// Creation order, used as a stable tie-breaker
    seq: u64,
    pipeline: Pipeline,
}

impl Inner {
    /// Stored pipelines in creation order
    fn ordered(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.pipelines.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TraceStore for MemoryTraceStore {
    async fn create(&self, trace: PipelineTrace) -> Result<Pipeline, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.pipelines.contains_key(&trace.pipeline_id) {
            return Err(StoreError::Conflict(trace.pipeline_id));
        }

        let pipeline = trace.into_pipeline(Utc::now().trunc_subsecs(6));
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.pipelines.insert(
            pipeline.pipeline_id.clone(),
            Entry {
                seq,
                pipeline: pipeline.clone(),
            },
        );

        Ok(pipeline)
    }

    async fn get(&self, pipeline_id: &str) -> Result<Option<Pipeline>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.pipelines.get(pipeline_id).map(|e| e.pipeline.clone()))
    }

    async fn merge(
        &self,
        pipeline_id: &str,
        snapshot: PipelineTrace,
    ) -> Result<Option<(Pipeline, MergeOutcome)>, StoreError> {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.pipelines.get_mut(pipeline_id) else {
            return Ok(None);
        };
        let outcome = entry.pipeline.merge_snapshot(snapshot);

        Ok(Some((entry.pipeline.clone(), outcome)))
    }

    async fn delete(&self, pipeline_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.pipelines.remove(pipeline_id).is_some())
    }

    async fn search(&self, query: &SearchPipelines) -> Result<Vec<Pipeline>, StoreError> {
        let inner = self.inner.read().await;

        let mut matched: Vec<&Entry> = inner
            .ordered()
            .into_iter()
            .filter(|e| query.matches(&e.pipeline))
            .collect();
        // Stable sort keeps creation order among equal start times.
        matched.sort_by(|a, b| b.pipeline.start_time.cmp(&a.pipeline.start_time));

        Ok(matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|e| e.pipeline.clone())
            .collect())
    }

    async fn aggregate_steps(&self, query: &AnalyzeSteps) -> Result<Vec<StepStats>, StoreError> {
        let inner = self.inner.read().await;

        let records = inner
            .ordered()
            .into_iter()
            .flat_map(|e| StepRecord::from_pipeline(&e.pipeline))
            .filter(|r| query.matches(r));

        Ok(aggregate_steps(records, query.limit as usize))
    }

    async fn scan_candidates(&self, min_rate: f64) -> Result<Vec<Candidate>, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner
            .ordered()
            .into_iter()
            .flat_map(|e| e.pipeline.candidates.iter())
            .filter(|c| c.elimination_rate() >= min_rate)
            .cloned()
            .collect())
    }
}
