//! Markdown report generation
//!
//! This module generates a human-readable markdown report of a mirror run,
//! including totals, failures, and the cross-origin links left behind.

use crate::crawler::CrawlReport;
use crate::output::stats::failure_breakdown;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown report for a crawl
///
/// Missing parent directories of `output_path` are created.
///
/// # Arguments
///
/// * `report` - The crawl report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Mirror Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Entrypoint**: {}\n", report.entrypoint));
    md.push_str(&format!(
        "- **Output Directory**: {}\n",
        report.output_directory.display()
    ));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Outcome**: {}\n\n", report.outcome));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Visited**: {}\n", report.pages_visited));
    md.push_str(&format!("- **Files Written**: {}\n", report.assets_written));
    md.push_str(&format!("- **Bytes Written**: {}\n", report.bytes_written));
    md.push_str(&format!("- **Total Failures**: {}\n", report.failure_count()));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    if let Some(cause) = report.abort_cause() {
        md.push_str("## Abort Cause\n\n");
        md.push_str(&format!(
            "Crawl stopped after `{}` at {}: {}\n\n",
            cause.kind, cause.url, cause.message
        ));
    }

    let breakdown = failure_breakdown(report);
    if !breakdown.is_empty() {
        md.push_str("## Failure Summary\n\n");
        md.push_str("| Failure | Count |\n");
        md.push_str("|---------|-------|\n");
        for (kind, count) in &breakdown {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');

        md.push_str("## Failures\n\n");
        md.push_str("| Kind | URL | Path | Message |\n");
        md.push_str("|------|-----|------|---------|\n");
        for failure in &report.failures {
            let path = failure
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                failure.kind,
                failure.url,
                path,
                failure.message.replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    if !report.skipped_cross_origin.is_empty() {
        md.push_str("## Skipped Cross-Origin Links\n\n");
        md.push_str(&format!(
            "Total skipped: {}\n\n",
            report.skipped_cross_origin.len()
        ));
        for url in report.skipped_cross_origin.iter().take(50) {
            md.push_str(&format!("- {}\n", url));
        }
        if report.skipped_cross_origin.len() > 50 {
            md.push_str(&format!(
                "\n... and {} more\n\n",
                report.skipped_cross_origin.len() - 50
            ));
        } else {
            md.push('\n');
        }
    }

    md
}
