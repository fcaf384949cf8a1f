//! Crawl summary printed to stdout

use crate::crawler::{CrawlReport, FailureKind};
use std::collections::BTreeMap;

/// Counts failures per kind, in a stable order
pub fn failure_breakdown(report: &CrawlReport) -> BTreeMap<FailureKind, usize> {
    let mut counts = BTreeMap::new();
    for failure in &report.failures {
        *counts.entry(failure.kind).or_insert(0) += 1;
    }
    counts
}

/// Prints a crawl report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("=== Mirror Summary ===\n");

    println!("Overview:");
    println!("  Entrypoint: {}", report.entrypoint);
    println!("  Output directory: {}", report.output_directory.display());
    println!("  Outcome: {}", report.outcome);
    if let Some(duration) = report.duration_seconds() {
        println!("  Duration: {}s", duration);
    }
    println!();

    println!("Results:");
    println!("  Pages visited: {}", report.pages_visited);
    println!("  Files written: {}", report.assets_written);
    println!("  Bytes written: {}", report.bytes_written);
    println!(
        "  Cross-origin links skipped: {}",
        report.skipped_cross_origin.len()
    );
    println!();

    let breakdown = failure_breakdown(report);
    if !breakdown.is_empty() {
        println!("Failures ({}):", report.failure_count());
        for (kind, count) in &breakdown {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if let Some(cause) = report.abort_cause() {
        println!("Aborted at {}: {}", cause.url, cause.message);
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} files written)",
        report.success_rate(),
        report.assets_written
    );
}
