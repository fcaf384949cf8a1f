//! Sumi-Mirror: a browser-driven website mirror
//!
//! This crate drives a real browser through a site, captures every same-origin
//! network response observed while each page loads, writes those bodies to a
//! local directory tree, and follows same-origin hyperlinks until the
//! reachable site graph is exhausted.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Mirror operations
///
/// Only failures that end the whole crawl surface here. Per-target failures
/// (navigation, body retrieval, writes) are recorded in the
/// [`CrawlReport`](crawler::CrawlReport) instead.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl aborted after failure at {url}: {message}")]
    Aborted { url: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL path escapes the output directory: {0}")]
    UnsafePath(String),
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CrawlOptions, CrawlOutcome, CrawlReport, Coordinator};
pub use url::{resolve_local_path, same_origin, ContentKind};
