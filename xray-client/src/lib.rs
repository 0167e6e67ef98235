//! X-Ray HTTP Client
//!
//! A typed async client for the X-Ray trace server, plus a [`Tracker`] that
//! pipelines use to capture their steps and filtering events as they run.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use xray_client::{Tracker, XRayClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = XRayClient::new("http://localhost:8000");
//!     let mut tracker = Tracker::new("competitor_selection");
//!
//!     tracker.capture_step(
//!         "keyword_generation",
//!         json!({ "title": "Phone Case" }),
//!         json!({ "keywords": ["phone", "case"] }),
//!         "Extracted keywords from the product title",
//!     );
//!     tracker.capture_candidates("price_filter", 1000, 5, vec!["price_range".to_string()]);
//!     tracker.complete(json!({ "competitor": "B0C1234" }));
//!
//!     let pipeline = tracker.flush(&client).await?;
//!     println!("Recorded pipeline: {}", pipeline.pipeline_id);
//!     Ok(())
//! }
//! ```

mod analysis;
pub mod error;
mod pipelines;
pub mod tracker;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use tracker::Tracker;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the X-Ray trace API
///
/// Methods are grouped into pipeline ingestion/lookup and cross-pipeline
/// analysis.
#[derive(Debug, Clone)]
pub struct XRayClient {
    /// Base URL of the server (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl XRayClient {
    /// Create a new client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each path segment
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::InvalidRequest(format!("Invalid server URL {}: {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidRequest(format!("Invalid server URL {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_response(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_response(status.as_u16(), &error_text));
        }

        Ok(())
    }
}
