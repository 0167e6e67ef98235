//! Cross-pipeline analysis and debugging endpoints

use xray_core::dto::debug::DebugReport;
use xray_core::dto::query::{AnalyzeSteps, HighElimination};
use xray_core::dto::response::CandidateResponse;
use xray_core::stats::StepStats;

use crate::XRayClient;
use crate::error::Result;

impl XRayClient {
    /// Step performance grouped by step name and pipeline type
    pub async fn analyze_steps(&self, query: &AnalyzeSteps) -> Result<Vec<StepStats>> {
        let url = self.url(&["api", "v1", "steps", "analyze"])?;
        let response = self.client.get(url).query(query).send().await?;

        self.handle_response(response).await
    }

    /// Filtering events that removed at least `min_rate` percent of their input
    pub async fn high_elimination(
        &self,
        query: &HighElimination,
    ) -> Result<Vec<CandidateResponse>> {
        let url = self.url(&["api", "v1", "candidates", "high-elimination"])?;
        let response = self.client.get(url).query(query).send().await?;

        self.handle_response(response).await
    }

    /// Step-by-step walkthrough of one pipeline with heuristic issue flags
    pub async fn debug_pipeline(&self, pipeline_id: &str) -> Result<DebugReport> {
        let url = self.url(&["api", "v1", "debug", "pipeline", pipeline_id])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }
}
