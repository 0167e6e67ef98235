//! X-Ray CLI
//!
//! Command-line interface for inspecting recorded pipeline traces.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "xray")]
#[command(about = "Inspect and debug multi-step pipeline traces", long_about = None)]
struct Cli {
    /// X-Ray server URL
    #[arg(long, env = "XRAY_SERVER_URL", default_value = "http://localhost:8000")]
    server_url: String,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
        json: cli.json,
    };

    handle_command(cli.command, &config).await
}
