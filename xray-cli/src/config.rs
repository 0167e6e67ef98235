//! Configuration module
//!
//! Settings shared by every CLI command.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the X-Ray server
    pub server_url: String,
    /// Print raw JSON instead of formatted output
    pub json: bool,
}
