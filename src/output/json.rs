//! JSON report export

use crate::crawler::CrawlReport;
use crate::output::{OutputError, OutputResult};
use std::path::Path;

/// Writes the full crawl report as pretty-printed JSON
///
/// Parent directories are created as needed.
pub fn write_json_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let json =
        serde_json::to_string_pretty(report).map_err(|e| OutputError::Format(e.to_string()))?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, json)?;

    tracing::debug!("JSON report written to {}", output_path.display());
    Ok(())
}
