//! Query Service
//!
//! Pipeline search, step-performance aggregation and the high-elimination
//! scan.

use xray_core::domain::candidate::Candidate;
use xray_core::domain::pipeline::Pipeline;
use xray_core::dto::query::{AnalyzeSteps, HighElimination, SearchPipelines};
use xray_core::stats::StepStats;

use super::{Result, ServiceError};
use crate::repository::TraceStore;

/// Largest page a single search or analysis may return
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Search pipelines by any combination of filters
pub async fn search_pipelines(
    store: &dyn TraceStore,
    mut query: SearchPipelines,
) -> Result<Vec<Pipeline>> {
    validate_date_range(query.start_date, query.end_date)?;
    if let Some(rate) = query.min_elimination_rate {
        validate_rate(rate)?;
    }

    query.limit = query.limit.min(MAX_PAGE_SIZE);
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    tracing::debug!(?query, "Searching pipelines");

    Ok(store.search(&query).await?)
}

/// Aggregate step performance across pipelines
pub async fn analyze_steps(store: &dyn TraceStore, mut query: AnalyzeSteps) -> Result<Vec<StepStats>> {
    validate_date_range(query.start_date, query.end_date)?;
    if let Some(min) = query.min_execution_time
        && min.is_nan()
    {
        return Err(ServiceError::InvalidInput(
            "min_execution_time must be a number".to_string(),
        ));
    }

    query.limit = query.limit.min(MAX_PAGE_SIZE);
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    tracing::debug!(?query, "Analyzing steps");

    Ok(store.aggregate_steps(&query).await?)
}

/// Every filtering event whose elimination rate reaches `min_rate`
pub async fn high_elimination(
    store: &dyn TraceStore,
    query: HighElimination,
) -> Result<Vec<Candidate>> {
    validate_rate(query.min_rate)?;

    tracing::debug!(min_rate = query.min_rate, "Scanning high-elimination candidates");

    Ok(store.scan_candidates(query.min_rate).await?)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_date_range(
    start: Option<chrono::DateTime<chrono::Utc>>,
    end: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(ServiceError::InvalidInput(format!(
            "start_date {start} is after end_date {end}"
        )));
    }
    Ok(())
}

fn validate_rate(rate: f64) -> Result<()> {
    // Negative thresholds are meaningful: rates drop below zero when a
    // filter reports more output than input.
    if rate.is_nan() {
        return Err(ServiceError::InvalidInput(
            "elimination rate threshold must be a number".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryTraceStore;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_search_rejects_inverted_range() {
        let store = MemoryTraceStore::new();
        let query = SearchPipelines {
            start_date: Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };

        let result = search_pipelines(&store, query).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_zero_limit_returns_empty_page() {
        let store = MemoryTraceStore::new();
        let query = SearchPipelines {
            limit: 0,
            ..Default::default()
        };
        assert!(search_pipelines(&store, query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nan_threshold_rejected() {
        let store = MemoryTraceStore::new();
        let result = high_elimination(&store, HighElimination { min_rate: f64::NAN }).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));

        let negative = high_elimination(&store, HighElimination { min_rate: -20.0 }).await;
        assert!(negative.is_ok());
    }
}
