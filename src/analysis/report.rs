//! Report generation for simulation runs and route statistics.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use chrono::Utc;
use color_eyre::eyre::{Context, Result};

use super::types::*;
use crate::sim::SimulationResult;
use crate::topology::Topology;
use crate::utils::units::format_ns;

/// Bundle a simulation result with run metadata
pub fn build_report(
    result: SimulationResult,
    topology: &Topology,
    config_path: &Path,
) -> SimulationReport {
    SimulationReport {
        metadata: ReportMetadata {
            generated_at: Utc::now().to_rfc3339(),
            config_path: config_path.display().to_string(),
            topology: topology.describe(),
            npus_count: topology.npus_count(),
            devices_count: topology.devices_count(),
        },
        summary: SimulationSummary::from_result(&result),
        result,
    }
}

/// Generate JSON report; the event trace is left to `generate_trace`
pub fn generate_json_report(report: &SimulationReport, output_path: &Path) -> Result<()> {
    let mut report = report.clone();
    report.result.trace.clear();
    let json =
        serde_json::to_string_pretty(&report).context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Write the event trace as a JSON array
pub fn generate_trace(result: &SimulationResult, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&result.trace)
        .context("Failed to serialize event trace to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write event trace to {}", output_path.display()))?;

    log::info!(
        "Event trace ({} records) written to {}",
        result.trace.len(),
        output_path.display()
    );
    Ok(())
}

/// Render the human-readable report
pub fn render_text_report(report: &SimulationReport) -> String {
    let result = &report.result;
    let summary = &report.summary;
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(80));
    lines.push("                    COLLECTIVE COMMUNICATION SIMULATION".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Report Date: {}", report.metadata.generated_at));
    lines.push(format!("Config: {}", report.metadata.config_path));
    lines.push(format!("Topology: {}", report.metadata.topology));
    lines.push(format!(
        "NPUs: {} ({} devices including switches)",
        report.metadata.npus_count, report.metadata.devices_count
    ));
    lines.push(format!("Collective: {}", result.collective));
    lines.push(format!("Data Size: {} bytes", result.data_size));
    lines.push(format!("Participants: {}", result.participants));
    lines.push(String::new());

    lines.push("=".repeat(80));
    lines.push("                                 TIMING".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());
    lines.push(format!(
        "Completion Time: {}",
        format_ns(summary.completion_time_ns)
    ));
    lines.push(format!("First Finish: {}", format_ns(summary.first_finish_ns)));
    lines.push(format!("Mean Finish: {:.1} ns", summary.mean_finish_ns));
    lines.push(format!("Events Processed: {}", result.events_processed));
    lines.push(format!(
        "Traffic: {} packets, {} bytes ({:.3} GB/s effective)",
        summary.total_packets_sent, summary.total_bytes_sent, summary.effective_bandwidth
    ));
    lines.push(String::new());

    lines.push("=".repeat(80));
    lines.push("                               PER-NODE".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());
    lines.push(format!(
        "{:>6}  {:>14}  {:>6}  {:>6}  {:>6}  {:>12}  {:>12}",
        "NPU", "Finish", "Rounds", "Sent", "Recv", "Bytes Sent", "Final Size"
    ));
    for node in &result.nodes {
        lines.push(format!(
            "{:>6}  {:>14}  {:>6}  {:>6}  {:>6}  {:>12}  {:>12}",
            node.npu,
            format_ns(node.finish_time_ns),
            node.rounds,
            node.packets_sent,
            node.packets_received,
            node.bytes_sent,
            node.final_data_size
        ));
    }
    lines.push(String::new());
    lines.push("=".repeat(80));

    lines.join("\n")
}

/// Generate human-readable text report
pub fn generate_text_report(report: &SimulationReport, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_text_report(report))
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print a short summary to stdout
pub fn print_summary(report: &SimulationReport) {
    let result = &report.result;
    println!("\n=== COLLECTIVE SIMULATION SUMMARY ===\n");
    println!("Topology: {}", report.metadata.topology);
    println!(
        "Collective: {} of {} bytes over {} participant(s)",
        result.collective, result.data_size, result.participants
    );
    println!(
        "Completion time: {}",
        format_ns(report.summary.completion_time_ns)
    );
    println!(
        "Packets sent: {} ({} bytes)",
        report.summary.total_packets_sent, report.summary.total_bytes_sent
    );
    println!("Events processed: {}", result.events_processed);
    println!();
}

/// Print route statistics to stdout
pub fn print_route_stats(stats: &RouteStats) {
    println!("\n=== ROUTE STATISTICS ===\n");
    println!("Topology: {} ({} NPUs)", stats.topology, stats.npus_count);
    match stats.selection {
        PairSelection::AllPairs => println!("Pairs: {} (all)", stats.pairs),
        PairSelection::Sampled { samples, seed } => {
            println!("Pairs: {} (sampled, seed {})", samples, seed)
        }
    }
    println!(
        "Hops: min {}, max {}, mean {:.3}",
        stats.min_hops, stats.max_hops, stats.mean_hops
    );
    println!("\nHistogram:");
    let widest = stats.histogram.values().copied().max().unwrap_or(0);
    for (hops, count) in &stats.histogram {
        let bar_len = if widest > 0 { count * 50 / widest } else { 0 };
        println!("  {:>4} | {:<50} {}", hops, "#".repeat(bar_len), count);
    }
    println!();
}
