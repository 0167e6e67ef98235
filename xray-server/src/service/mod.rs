//! Service Module
//!
//! Business logic layer for the trace server.
//! Services validate requests, call the trace store and apply domain rules.

pub mod debug;
pub mod pipeline;
pub mod query;

// Re-export for convenience
pub use debug as debug_service;
pub use pipeline as pipeline_service;
pub use query as query_service;

use thiserror::Error;

use crate::repository::StoreError;

/// Service error type
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Pipeline {0} already exists")]
    Conflict(String),

    #[error("Pipeline {0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(pipeline_id) => ServiceError::Conflict(pipeline_id),
            other => ServiceError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
