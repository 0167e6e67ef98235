//! Step domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Metadata;

/// One recorded decision/processing unit within a pipeline
///
/// Created once by ingestion and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub step_name: String,
    pub inputs: Value,
    pub outputs: Value,
    pub reasoning: String,
    /// Producer-assigned capture time, also the merge idempotency key
    pub timestamp: DateTime<Utc>,
    pub execution_time_ms: Option<f64>,
    pub metadata: Metadata,
}
