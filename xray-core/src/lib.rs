//! X-Ray Core
//!
//! Core types and pure logic shared by every X-Ray component.
//!
//! This crate contains:
//! - Domain types: the trace aggregate (Pipeline, Step, Candidate)
//! - DTOs: trace snapshots, queries, reports and wire responses
//! - Stats: step-performance aggregation shared by all trace stores

pub mod domain;
pub mod dto;
pub mod stats;
pub mod summary;
