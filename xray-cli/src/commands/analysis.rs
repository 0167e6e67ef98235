//! Analysis command handlers
//!
//! Step performance, high-elimination scans and the debug walkthrough.

use anyhow::Result;
use colored::*;
use xray_client::XRayClient;
use xray_core::dto::debug::{DebugReport, Issue};
use xray_core::dto::query::{AnalyzeSteps, HighElimination};
use xray_core::summary;

use super::pipeline::colored_status;
use super::print_json;
use crate::config::Config;

pub async fn analyze_steps(client: &XRayClient, config: &Config, query: &AnalyzeSteps) -> Result<()> {
    let stats = client.analyze_steps(query).await?;

    if config.json {
        return print_json(&stats);
    }

    if stats.is_empty() {
        println!("{}", "No matching steps.".yellow());
        return Ok(());
    }

    println!("{}", "Step Performance:".bold());
    println!();
    for group in &stats {
        println!(
            "  {} {} ({})",
            "▸".cyan(),
            group.step_name.bold(),
            group.pipeline_type.dimmed()
        );
        println!("    Executions:   {}", group.total_executions);
        println!("    Avg time:     {:.1}ms", group.avg_execution_time_ms);
        println!("    Success rate: {:.1}%", group.success_rate);
        for pattern in &group.common_reasoning_patterns {
            println!("      - {}", pattern.dimmed());
        }
        println!();
    }

    Ok(())
}

pub async fn high_elimination(
    client: &XRayClient,
    config: &Config,
    query: &HighElimination,
) -> Result<()> {
    let candidates = client.high_elimination(query).await?;

    if config.json {
        return print_json(&candidates);
    }

    if candidates.is_empty() {
        println!(
            "{}",
            format!("No filtering events at or above {}%.", query.min_rate).yellow()
        );
        return Ok(());
    }

    println!(
        "{}",
        format!("High-elimination filters ({}):", candidates.len()).bold()
    );
    for candidate in &candidates {
        println!(
            "  {} {:<30} {:>8} → {:<8} {}",
            "▸".cyan(),
            candidate.candidate.step_name.bold(),
            candidate.candidate.input_count,
            candidate.candidate.output_count,
            format!("{:.2}%", candidate.elimination_rate).red()
        );
    }

    Ok(())
}

pub async fn debug_pipeline(client: &XRayClient, config: &Config, id: &str) -> Result<()> {
    let report = client.debug_pipeline(id).await?;

    if config.json {
        return print_json(&report);
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &DebugReport) {
    println!("{}", "Debug Walkthrough:".bold());
    println!("  Pipeline: {}", report.pipeline_id.cyan());
    println!("  Type:     {}", report.pipeline_type.bold());
    println!("  Status:   {}", colored_status(report.status));
    if let Some(error) = &report.error_message {
        println!("  Error:    {}", error.red());
    }
    if let Some(result) = &report.final_result {
        println!("  Result:   {}", summary::render(result));
    }

    println!(
        "\n{}",
        format!("Execution ({} steps):", report.total_steps).bold()
    );
    println!("{}", "─".repeat(80).dimmed());
    for step in &report.execution_summary {
        let timing = step
            .execution_time_ms
            .map(|ms| format!("{:.1}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. {} ({})",
            step.step_number,
            step.step_name.bold(),
            timing.dimmed()
        );
        println!("     In:  {}", summary::render(&step.inputs_summary).dimmed());
        println!("     Out: {}", summary::render(&step.outputs_summary).dimmed());
        println!("     Why: {}", step.reasoning);
        print_issues(&step.potential_issues);
    }

    println!(
        "\n{}",
        format!("Filtering ({} events):", report.total_filtering_steps).bold()
    );
    println!("{}", "─".repeat(80).dimmed());
    for filter in &report.filtering_analysis {
        println!(
            "  {} {} → {} ({:.2}% eliminated)",
            filter.step_name.bold(),
            filter.input_count,
            filter.output_count,
            filter.elimination_rate
        );
        if !filter.filters_applied.is_empty() {
            println!("     Filters: {}", filter.filters_applied.join(", ").dimmed());
        }
        for (reason, count) in &filter.rejection_summary {
            println!("     {} {}", format!("{}:", reason).dimmed(), summary::render(count));
        }
        print_issues(&filter.potential_issues);
    }
}

fn print_issues(issues: &[Issue]) {
    for issue in issues {
        println!("     {} {}", "⚠".yellow(), issue.message().yellow());
    }
}
