//! Output module for reporting crawl results
//!
//! This module handles:
//! - Printing a crawl summary to stdout
//! - Writing a markdown report
//! - Writing the full report as JSON

mod json;
mod markdown;
pub mod stats;

pub use json::write_json_report;
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::print_report;

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
