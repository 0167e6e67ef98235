use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            pipeline_id TEXT NOT NULL UNIQUE,
            pipeline_type TEXT NOT NULL,
            start_time TIMESTAMPTZ NOT NULL,
            end_time TIMESTAMPTZ,
            status VARCHAR(20) NOT NULL DEFAULT 'running',
            final_result JSONB,
            error_message TEXT,
            metadata JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create steps table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS steps (
            id UUID PRIMARY KEY,
            seq BIGSERIAL NOT NULL,
            pipeline_db_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            step_name TEXT NOT NULL,
            inputs JSONB NOT NULL,
            outputs JSONB NOT NULL,
            reasoning TEXT NOT NULL,
            timestamp TIMESTAMPTZ NOT NULL,
            execution_time_ms DOUBLE PRECISION,
            metadata JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create candidates table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            id UUID PRIMARY KEY,
            seq BIGSERIAL NOT NULL,
            pipeline_db_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            step_name TEXT NOT NULL,
            input_count BIGINT NOT NULL,
            output_count BIGINT NOT NULL,
            filters_applied TEXT[] NOT NULL DEFAULT '{}',
            sample_rejections JSONB NOT NULL DEFAULT '{}',
            sample_accepted JSONB NOT NULL DEFAULT '[]',
            sample_rejected JSONB NOT NULL DEFAULT '[]',
            timestamp TIMESTAMPTZ NOT NULL,
            metadata JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for search and aggregation
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipelines_type ON pipelines(pipeline_type)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipelines_status ON pipelines(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipelines_start_time ON pipelines(start_time DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_steps_pipeline ON steps(pipeline_db_id, seq)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_steps_name ON steps(step_name)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_candidates_pipeline ON candidates(pipeline_db_id, seq)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
