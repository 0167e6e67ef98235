//! Data Transfer Objects
//!
//! Shapes exchanged between producers, the X-Ray server and its consumers:
//! trace snapshots sent by producers, query parameters, and the
//! report/response types handed back to operators.

pub mod debug;
pub mod query;
pub mod response;
pub mod trace;
