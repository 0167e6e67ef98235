//! Core domain types
//!
//! A Pipeline is the aggregate root of a recorded trace. Steps and Candidates
//! have no identity outside their owning Pipeline and are always reached
//! through it.

pub mod candidate;
pub mod pipeline;
pub mod step;

/// Opaque producer-supplied key/value mapping
pub type Metadata = serde_json::Map<String, serde_json::Value>;
