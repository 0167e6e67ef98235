//! Pipeline ingestion and lookup endpoints

use xray_core::dto::query::SearchPipelines;
use xray_core::dto::response::PipelineResponse;
use xray_core::dto::trace::PipelineTrace;

use crate::XRayClient;
use crate::error::Result;

impl XRayClient {
    // =============================================================================
    // Pipeline Ingestion
    // =============================================================================

    /// Record the first snapshot of a pipeline
    ///
    /// Fails with [`ClientError::Conflict`](crate::ClientError::Conflict) when
    /// the pipeline id is already taken.
    pub async fn create_pipeline(&self, trace: &PipelineTrace) -> Result<PipelineResponse> {
        let url = self.url(&["api", "v1", "pipelines"])?;
        let response = self.client.post(url).json(trace).send().await?;

        self.handle_response(response).await
    }

    /// Resubmit the full snapshot of an existing pipeline
    ///
    /// Steps and candidates already stored are not duplicated.
    pub async fn merge_pipeline(
        &self,
        pipeline_id: &str,
        trace: &PipelineTrace,
    ) -> Result<PipelineResponse> {
        let url = self.url(&["api", "v1", "pipelines", pipeline_id])?;
        let response = self.client.put(url).json(trace).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Pipeline Lookup
    // =============================================================================

    /// Get a pipeline with its steps and candidates
    pub async fn get_pipeline(&self, pipeline_id: &str) -> Result<PipelineResponse> {
        let url = self.url(&["api", "v1", "pipelines", pipeline_id])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// Delete a pipeline and everything recorded under it
    pub async fn delete_pipeline(&self, pipeline_id: &str) -> Result<()> {
        let url = self.url(&["api", "v1", "pipelines", pipeline_id])?;
        let response = self.client.delete(url).send().await?;

        self.handle_empty_response(response).await
    }

    /// Search pipelines; unset filters are left out of the query string
    pub async fn search_pipelines(&self, query: &SearchPipelines) -> Result<Vec<PipelineResponse>> {
        let url = self.url(&["api", "v1", "pipelines", "search"])?;
        let response = self.client.get(url).query(query).send().await?;

        self.handle_response(response).await
    }

    /// Check that the server is up
    pub async fn health(&self) -> Result<()> {
        let url = self.url(&["health"])?;
        let response = self.client.get(url).send().await?;

        self.handle_empty_response(response).await
    }
}
