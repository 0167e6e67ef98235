//! Pipeline command handlers
//!
//! Viewing, searching and deleting recorded pipelines.

use anyhow::Result;
use colored::*;
use xray_client::XRayClient;
use xray_core::domain::pipeline::PipelineStatus;
use xray_core::dto::query::SearchPipelines;
use xray_core::dto::response::PipelineResponse;
use xray_core::summary;

use super::print_json;
use crate::config::Config;

pub async fn get_pipeline(client: &XRayClient, config: &Config, id: &str) -> Result<()> {
    let pipeline = client.get_pipeline(id).await?;

    if config.json {
        return print_json(&pipeline);
    }

    print_pipeline_details(&pipeline);
    Ok(())
}

pub async fn search_pipelines(
    client: &XRayClient,
    config: &Config,
    query: &SearchPipelines,
) -> Result<()> {
    let pipelines = client.search_pipelines(query).await?;

    if config.json {
        return print_json(&pipelines);
    }

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Pipelines ({}):", pipelines.len()).bold());
    println!();
    for pipeline in &pipelines {
        print_pipeline_summary(pipeline);
    }

    Ok(())
}

pub async fn delete_pipeline(client: &XRayClient, id: &str) -> Result<()> {
    client.delete_pipeline(id).await?;

    println!("{}", "✓ Pipeline deleted successfully!".green().bold());
    println!("  ID: {}", id.dimmed());

    Ok(())
}

pub(super) fn colored_status(status: PipelineStatus) -> ColoredString {
    match status {
        PipelineStatus::Running => status.as_str().yellow(),
        PipelineStatus::Completed => status.as_str().green(),
        PipelineStatus::Failed => status.as_str().red(),
    }
}

/// Print a pipeline summary
fn print_pipeline_summary(pipeline: &PipelineResponse) {
    println!(
        "  {} {} [{}]",
        "▸".cyan(),
        pipeline.pipeline_id.bold(),
        colored_status(pipeline.status)
    );
    println!("    Type:    {}", pipeline.pipeline_type.dimmed());
    println!(
        "    Started: {}",
        pipeline
            .start_time
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!(
        "    Steps:   {}  Filters: {}",
        pipeline.steps.len().to_string().dimmed(),
        pipeline.candidates.len().to_string().dimmed()
    );
    println!();
}

/// Print detailed pipeline information
fn print_pipeline_details(pipeline: &PipelineResponse) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:       {}", pipeline.pipeline_id.cyan());
    println!("  Type:     {}", pipeline.pipeline_type.bold());
    println!("  Status:   {}", colored_status(pipeline.status));
    println!(
        "  Started:  {}",
        pipeline.start_time.format("%Y-%m-%d %H:%M:%S%.3f")
    );
    if let Some(end_time) = pipeline.end_time {
        println!("  Finished: {}", end_time.format("%Y-%m-%d %H:%M:%S%.3f"));
    }
    if let Some(result) = &pipeline.final_result {
        println!("  Result:   {}", summary::render(result));
    }
    if let Some(error) = &pipeline.error_message {
        println!("  Error:    {}", error.red());
    }

    println!("\n{}", format!("Steps ({}):", pipeline.steps.len()).bold());
    println!("{}", "─".repeat(80).dimmed());
    for (i, step) in pipeline.steps.iter().enumerate() {
        let timing = step
            .execution_time_ms
            .map(|ms| format!("{:.1}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. {} ({})",
            i + 1,
            step.step_name.bold(),
            timing.dimmed()
        );
        println!(
            "     {}",
            summary::truncate(&step.reasoning, summary::SUMMARY_CHARS).dimmed()
        );
    }

    if !pipeline.candidates.is_empty() {
        println!(
            "\n{}",
            format!("Filtering ({}):", pipeline.candidates.len()).bold()
        );
        println!("{}", "─".repeat(80).dimmed());
        for candidate in &pipeline.candidates {
            println!(
                "  {} {} → {} ({:.2}% eliminated)",
                candidate.candidate.step_name.bold(),
                candidate.candidate.input_count,
                candidate.candidate.output_count,
                candidate.elimination_rate
            );
            if !candidate.candidate.filters_applied.is_empty() {
                println!(
                    "     Filters: {}",
                    candidate.candidate.filters_applied.join(", ").dimmed()
                );
            }
        }
    }
}
