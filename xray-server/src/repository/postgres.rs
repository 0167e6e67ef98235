//! Postgres trace store
//!
//! Pipelines, steps and candidates live in three tables. Create and merge
//! each run in one transaction; merge locks the pipeline row first so that
//! concurrent merges of the same pipeline see each other's appended history.
//! The elimination rate is never a column: SQL filters recompute it with
//! [`ELIMINATION_RATE_SQL`], the same formula as
//! [`xray_core::domain::candidate::elimination_rate`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use xray_core::domain::Metadata;
use xray_core::domain::candidate::Candidate;
use xray_core::domain::pipeline::{MergeOutcome, Pipeline, PipelineStatus};
use xray_core::domain::step::Step;
use xray_core::dto::query::{AnalyzeSteps, SearchPipelines};
use xray_core::dto::trace::PipelineTrace;
use xray_core::stats::{StepRecord, StepStats, aggregate_steps};

use super::{StoreError, TraceStore};

/// Elimination rate of candidate alias `c`
pub const ELIMINATION_RATE_SQL: &str = "CASE WHEN c.input_count > 0 \
     THEN (c.input_count - c.output_count)::DOUBLE PRECISION * 100 / c.input_count \
     ELSE 0 END";

const PIPELINE_COLUMNS: &str = "p.id, p.pipeline_id, p.pipeline_type, p.start_time, p.end_time, \
     p.status, p.final_result, p.error_message, p.metadata, p.created_at";

const STEP_COLUMNS: &str = "s.id, s.pipeline_db_id, s.step_name, s.inputs, s.outputs, \
     s.reasoning, s.timestamp, s.execution_time_ms, s.metadata";

const CANDIDATE_COLUMNS: &str = "c.id, c.pipeline_db_id, c.step_name, c.input_count, \
     c.output_count, c.filters_applied, c.sample_rejections, c.sample_accepted, \
     c.sample_rejected, c.timestamp, c.metadata";

/// Trace store backed by a Postgres pool
#[derive(Clone)]
pub struct PgTraceStore {
    pool: PgPool,
}

impl PgTraceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TraceStore for PgTraceStore {
    async fn create(&self, trace: PipelineTrace) -> Result<Pipeline, StoreError> {
        let pipeline = trace.into_pipeline(Utc::now().trunc_subsecs(6));
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO pipelines (
                id, pipeline_id, pipeline_type, start_time, end_time,
                status, final_result, error_message, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (pipeline_id) DO NOTHING
            "#,
        )
        .bind(pipeline.id)
        .bind(&pipeline.pipeline_id)
        .bind(&pipeline.pipeline_type)
        .bind(pipeline.start_time)
        .bind(pipeline.end_time)
        .bind(pipeline.status.as_str())
        .bind(&pipeline.final_result)
        .bind(&pipeline.error_message)
        .bind(Json(&pipeline.metadata))
        .bind(pipeline.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::Conflict(pipeline.pipeline_id));
        }

        insert_steps(&mut tx, pipeline.id, &pipeline.steps).await?;
        insert_candidates(&mut tx, pipeline.id, &pipeline.candidates).await?;
        tx.commit().await?;

        Ok(pipeline)
    }

    async fn get(&self, pipeline_id: &str) -> Result<Option<Pipeline>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, PipelineRow>(&format!(
            "SELECT {PIPELINE_COLUMNS} FROM pipelines p WHERE p.pipeline_id = $1"
        ))
        .bind(pipeline_id)
        .fetch_optional(&mut *tx)
        .await?;

        let pipeline = match row {
            Some(row) => Some(load_children(&mut tx, vec![row]).await?.remove(0)),
            None => None,
        };
        tx.commit().await?;

        Ok(pipeline)
    }

    async fn merge(
        &self,
        pipeline_id: &str,
        snapshot: PipelineTrace,
    ) -> Result<Option<(Pipeline, MergeOutcome)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PipelineRow>(&format!(
            "SELECT {PIPELINE_COLUMNS} FROM pipelines p WHERE p.pipeline_id = $1 FOR UPDATE"
        ))
        .bind(pipeline_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut pipeline = load_children(&mut tx, vec![row]).await?.remove(0);
        let stored_steps = pipeline.steps.len();
        let stored_candidates = pipeline.candidates.len();
        let outcome = pipeline.merge_snapshot(snapshot);

        sqlx::query(
            r#"
            UPDATE pipelines
            SET end_time = $1, status = $2, final_result = $3, error_message = $4, metadata = $5
            WHERE id = $6
            "#,
        )
        .bind(pipeline.end_time)
        .bind(pipeline.status.as_str())
        .bind(&pipeline.final_result)
        .bind(&pipeline.error_message)
        .bind(Json(&pipeline.metadata))
        .bind(pipeline.id)
        .execute(&mut *tx)
        .await?;

        insert_steps(&mut tx, pipeline.id, &pipeline.steps[stored_steps..]).await?;
        insert_candidates(&mut tx, pipeline.id, &pipeline.candidates[stored_candidates..]).await?;
        tx.commit().await?;

        Ok(Some((pipeline, outcome)))
    }

    async fn delete(&self, pipeline_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM pipelines WHERE pipeline_id = $1")
            .bind(pipeline_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &SearchPipelines) -> Result<Vec<Pipeline>, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {PIPELINE_COLUMNS} FROM pipelines p WHERE TRUE"
        ));

        if let Some(pipeline_type) = &query.pipeline_type {
            builder.push(" AND p.pipeline_type = ");
            builder.push_bind(pipeline_type);
        }
        if let Some(status) = query.status {
            builder.push(" AND p.status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(start) = query.start_date {
            builder.push(" AND p.start_time >= ");
            builder.push_bind(start);
        }
        if let Some(end) = query.end_date {
            builder.push(" AND p.start_time <= ");
            builder.push_bind(end);
        }
        if let Some(step_name) = &query.step_name {
            builder.push(
                " AND EXISTS (SELECT 1 FROM steps s WHERE s.pipeline_db_id = p.id AND s.step_name = ",
            );
            builder.push_bind(step_name);
            builder.push(")");
        }
        if let Some(min_rate) = query.min_elimination_rate {
            builder.push(format!(
                " AND EXISTS (SELECT 1 FROM candidates c WHERE c.pipeline_db_id = p.id AND {ELIMINATION_RATE_SQL} >= "
            ));
            builder.push_bind(min_rate);
            builder.push(")");
        }

        builder.push(" ORDER BY p.start_time DESC, p.created_at ASC, p.id ASC LIMIT ");
        builder.push_bind(i64::from(query.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(query.offset));

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let rows = builder
            .build_query_as::<PipelineRow>()
            .fetch_all(&mut *tx)
            .await?;
        let pipelines = load_children(&mut tx, rows).await?;
        tx.commit().await?;

        Ok(pipelines)
    }

    async fn aggregate_steps(&self, query: &AnalyzeSteps) -> Result<Vec<StepStats>, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT s.step_name, p.pipeline_type, p.status, s.reasoning, s.timestamp, s.execution_time_ms \
             FROM steps s JOIN pipelines p ON p.id = s.pipeline_db_id WHERE TRUE",
        );

        if let Some(step_name) = &query.step_name {
            builder.push(" AND s.step_name = ");
            builder.push_bind(step_name);
        }
        if let Some(pipeline_type) = &query.pipeline_type {
            builder.push(" AND p.pipeline_type = ");
            builder.push_bind(pipeline_type);
        }
        if let Some(start) = query.start_date {
            builder.push(" AND s.timestamp >= ");
            builder.push_bind(start);
        }
        if let Some(end) = query.end_date {
            builder.push(" AND s.timestamp <= ");
            builder.push_bind(end);
        }
        if let Some(min) = query.min_execution_time {
            builder.push(" AND s.execution_time_ms >= ");
            builder.push_bind(min);
        }
        builder.push(" ORDER BY p.created_at ASC, p.id ASC, s.seq ASC");

        let rows = builder
            .build_query_as::<StepRecordRow>()
            .fetch_all(&self.pool)
            .await?;
        let records = rows
            .into_iter()
            .map(StepRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(aggregate_steps(records, query.limit as usize))
    }

    async fn scan_candidates(&self, min_rate: f64) -> Result<Vec<Candidate>, StoreError> {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates c \
             JOIN pipelines p ON p.id = c.pipeline_db_id \
             WHERE {ELIMINATION_RATE_SQL} >= $1 \
             ORDER BY p.created_at ASC, p.id ASC, c.seq ASC"
        ))
        .bind(min_rate)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Candidate::from).collect())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

async fn insert_steps(
    conn: &mut PgConnection,
    pipeline_db_id: Uuid,
    steps: &[Step],
) -> Result<(), sqlx::Error> {
    for step in steps {
        sqlx::query(
            r#"
            INSERT INTO steps (
                id, pipeline_db_id, step_name, inputs, outputs,
                reasoning, timestamp, execution_time_ms, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(step.id)
        .bind(pipeline_db_id)
        .bind(&step.step_name)
        .bind(&step.inputs)
        .bind(&step.outputs)
        .bind(&step.reasoning)
        .bind(step.timestamp)
        .bind(step.execution_time_ms)
        .bind(Json(&step.metadata))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn insert_candidates(
    conn: &mut PgConnection,
    pipeline_db_id: Uuid,
    candidates: &[Candidate],
) -> Result<(), sqlx::Error> {
    for candidate in candidates {
        sqlx::query(
            r#"
            INSERT INTO candidates (
                id, pipeline_db_id, step_name, input_count, output_count,
                filters_applied, sample_rejections, sample_accepted, sample_rejected,
                timestamp, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(candidate.id)
        .bind(pipeline_db_id)
        .bind(&candidate.step_name)
        .bind(candidate.input_count)
        .bind(candidate.output_count)
        .bind(&candidate.filters_applied)
        .bind(Json(&candidate.sample_rejections))
        .bind(Json(&candidate.sample_accepted))
        .bind(Json(&candidate.sample_rejected))
        .bind(candidate.timestamp)
        .bind(Json(&candidate.metadata))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Attach steps and candidates to pipeline rows, preserving row order
async fn load_children(
    conn: &mut PgConnection,
    rows: Vec<PipelineRow>,
) -> Result<Vec<Pipeline>, StoreError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let step_rows = sqlx::query_as::<_, StepRow>(&format!(
        "SELECT {STEP_COLUMNS} FROM steps s WHERE s.pipeline_db_id = ANY($1) ORDER BY s.seq ASC"
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let candidate_rows = sqlx::query_as::<_, CandidateRow>(&format!(
        "SELECT {CANDIDATE_COLUMNS} FROM candidates c WHERE c.pipeline_db_id = ANY($1) ORDER BY c.seq ASC"
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut steps: HashMap<Uuid, Vec<Step>> = HashMap::new();
    for row in step_rows {
        steps.entry(row.pipeline_db_id).or_default().push(row.into());
    }
    let mut candidates: HashMap<Uuid, Vec<Candidate>> = HashMap::new();
    for row in candidate_rows {
        candidates
            .entry(row.pipeline_db_id)
            .or_default()
            .push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let id = row.id;
            let mut pipeline = Pipeline::try_from(row)?;
            pipeline.steps = steps.remove(&id).unwrap_or_default();
            pipeline.candidates = candidates.remove(&id).unwrap_or_default();
            Ok(pipeline)
        })
        .collect()
}

fn parse_status(status: &str) -> Result<PipelineStatus, StoreError> {
    status.parse().map_err(StoreError::Corrupt)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    pipeline_id: String,
    pipeline_type: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    status: String,
    final_result: Option<Value>,
    error_message: Option<String>,
    metadata: Json<Metadata>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = StoreError;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        Ok(Pipeline {
            id: row.id,
            pipeline_id: row.pipeline_id,
            pipeline_type: row.pipeline_type,
            start_time: row.start_time,
            end_time: row.end_time,
            status: parse_status(&row.status)?,
            final_result: row.final_result,
            error_message: row.error_message,
            metadata: row.metadata.0,
            created_at: row.created_at,
            steps: Vec::new(),
            candidates: Vec::new(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: Uuid,
    pipeline_db_id: Uuid,
    step_name: String,
    inputs: Value,
    outputs: Value,
    reasoning: String,
    timestamp: DateTime<Utc>,
    execution_time_ms: Option<f64>,
    metadata: Json<Metadata>,
}

impl From<StepRow> for Step {
    fn from(row: StepRow) -> Self {
        Step {
            id: row.id,
            step_name: row.step_name,
            inputs: row.inputs,
            outputs: row.outputs,
            reasoning: row.reasoning,
            timestamp: row.timestamp,
            execution_time_ms: row.execution_time_ms,
            metadata: row.metadata.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    pipeline_db_id: Uuid,
    step_name: String,
    input_count: i64,
    output_count: i64,
    filters_applied: Vec<String>,
    sample_rejections: Json<Metadata>,
    sample_accepted: Json<Vec<Value>>,
    sample_rejected: Json<Vec<Value>>,
    timestamp: DateTime<Utc>,
    metadata: Json<Metadata>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Candidate {
            id: row.id,
            step_name: row.step_name,
            input_count: row.input_count,
            output_count: row.output_count,
            filters_applied: row.filters_applied,
            sample_rejections: row.sample_rejections.0,
            sample_accepted: row.sample_accepted.0,
            sample_rejected: row.sample_rejected.0,
            timestamp: row.timestamp,
            metadata: row.metadata.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StepRecordRow {
    step_name: String,
    pipeline_type: String,
    status: String,
    reasoning: String,
    timestamp: DateTime<Utc>,
    execution_time_ms: Option<f64>,
}

impl TryFrom<StepRecordRow> for StepRecord {
    type Error = StoreError;

    fn try_from(row: StepRecordRow) -> Result<Self, Self::Error> {
        Ok(StepRecord {
            step_name: row.step_name,
            pipeline_type: row.pipeline_type,
            pipeline_status: parse_status(&row.status)?,
            reasoning: row.reasoning,
            timestamp: row.timestamp,
            execution_time_ms: row.execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_rejects_unknown_value() {
        assert_eq!(parse_status("failed").unwrap(), PipelineStatus::Failed);
        assert!(matches!(parse_status("Queued"), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_rate_sql_guards_zero_input() {
        assert!(ELIMINATION_RATE_SQL.contains("c.input_count > 0"));
        assert!(ELIMINATION_RATE_SQL.contains("ELSE 0"));
    }
}
