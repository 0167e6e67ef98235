//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod analysis;
mod pipeline;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use serde::Serialize;
use xray_client::XRayClient;
use xray_core::domain::pipeline::PipelineStatus;
use xray_core::dto::query::{
    AnalyzeSteps, DEFAULT_LIMIT, DEFAULT_MIN_ELIMINATION_RATE, HighElimination, SearchPipelines,
};

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show a pipeline with its steps and filtering events
    Get {
        /// Pipeline ID
        id: String,
    },
    /// Search pipelines
    Search {
        /// Pipeline type
        #[arg(short = 't', long = "type")]
        pipeline_type: Option<String>,

        /// Pipeline status (running, completed, failed)
        #[arg(short, long)]
        status: Option<PipelineStatus>,

        /// Earliest start time (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<DateTime<Utc>>,

        /// Latest start time (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_timestamp)]
        until: Option<DateTime<Utc>>,

        /// Only pipelines that recorded this step
        #[arg(long)]
        step: Option<String>,

        /// Only pipelines with a filtering event at or above this rate
        #[arg(long)]
        min_elimination_rate: Option<f64>,

        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Step performance grouped by step name and pipeline type
    Analyze {
        /// Step name
        #[arg(long)]
        step: Option<String>,

        /// Pipeline type
        #[arg(short = 't', long = "type")]
        pipeline_type: Option<String>,

        /// Earliest step time (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<DateTime<Utc>>,

        /// Latest step time (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_timestamp)]
        until: Option<DateTime<Utc>>,

        /// Only steps that took at least this many milliseconds
        #[arg(long)]
        min_time: Option<f64>,

        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },
    /// Filtering events with a high elimination rate
    HighElimination {
        /// Minimum elimination rate in percent
        #[arg(long, default_value_t = DEFAULT_MIN_ELIMINATION_RATE)]
        min_rate: f64,
    },
    /// Step-by-step walkthrough of a pipeline with potential issues
    Debug {
        /// Pipeline ID
        id: String,
    },
    /// Delete a pipeline
    Delete {
        /// Pipeline ID
        id: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = XRayClient::new(&config.server_url);

    match command {
        Commands::Get { id } => pipeline::get_pipeline(&client, config, &id).await,
        Commands::Search {
            pipeline_type,
            status,
            since,
            until,
            step,
            min_elimination_rate,
            limit,
            offset,
        } => {
            let query = SearchPipelines {
                pipeline_type,
                status,
                start_date: since,
                end_date: until,
                step_name: step,
                min_elimination_rate,
                limit,
                offset,
            };
            pipeline::search_pipelines(&client, config, &query).await
        }
        Commands::Analyze {
            step,
            pipeline_type,
            since,
            until,
            min_time,
            limit,
        } => {
            let query = AnalyzeSteps {
                step_name: step,
                pipeline_type,
                start_date: since,
                end_date: until,
                min_execution_time: min_time,
                limit,
            };
            analysis::analyze_steps(&client, config, &query).await
        }
        Commands::HighElimination { min_rate } => {
            analysis::high_elimination(&client, config, &HighElimination { min_rate }).await
        }
        Commands::Debug { id } => analysis::debug_pipeline(&client, config, &id).await,
        Commands::Delete { id } => pipeline::delete_pipeline(&client, &id).await,
    }
}

/// Parse an RFC 3339 timestamp, or a bare date taken as midnight UTC
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(s) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow!("invalid timestamp `{}`: expected RFC 3339 or YYYY-MM-DD", s))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let parsed = parse_timestamp("2025-03-01T12:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_bare_date() {
        let parsed = parse_timestamp("2025-03-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
