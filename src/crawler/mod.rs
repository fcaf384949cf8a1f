//! Crawler module for capturing and mirroring pages
//!
//! This module contains the core mirroring logic, including:
//! - Capturing same-origin responses while a page loads
//! - Writing response bodies to the mirror directory
//! - Extracting links from the rendered page
//! - Overall crawl coordination and cycle prevention

mod capture;
mod coordinator;
mod links;
mod materializer;
mod report;
mod visited;

pub use capture::{is_http_protocol, CaptureBridge, Discard, ResponseLedger, ResponseRecord};
pub use coordinator::{run_crawl, Coordinator, CrawlTarget};
pub use links::{extract_links, parse_page_links, PageLinks, HREF_QUERY};
pub use materializer::{decode_body, materialize, MaterializeError};
pub use report::{CrawlFailure, CrawlOutcome, CrawlReport, FailureKind};
pub use visited::VisitedSet;

use crate::browser::chromium::ChromiumBrowser;
use crate::browser::{Browser, WaitCondition};
use crate::config::{Config, FailurePolicy};
use crate::MirrorError;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for one crawl
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Directory the mirror is written into
    pub output_directory: PathBuf,

    /// Load milestone each navigation waits for
    pub wait_condition: WaitCondition,

    /// Upper bound on a single navigation; unbounded when `None`
    pub navigation_timeout: Option<Duration>,

    /// Always true: only the entrypoint's origin is mirrored
    pub same_origin_only: bool,

    /// Reaction to failed navigations, fetches and writes
    pub on_failure: FailurePolicy,
}

impl CrawlOptions {
    /// Default options writing into `output_directory`
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            wait_condition: WaitCondition::default(),
            navigation_timeout: None,
            same_origin_only: true,
            on_failure: FailurePolicy::default(),
        }
    }
}

impl From<&Config> for CrawlOptions {
    fn from(config: &Config) -> Self {
        Self {
            output_directory: PathBuf::from(&config.output.directory),
            wait_condition: config.crawl.wait_until,
            navigation_timeout: config.crawl.navigation_timeout_ms.map(Duration::from_millis),
            same_origin_only: config.crawl.same_origin_only,
            on_failure: config.crawl.on_failure,
        }
    }
}

/// Runs a complete mirror operation with Chromium
///
/// This is the main entry point for mirroring a site. It will:
/// 1. Launch the browser and open a page
/// 2. Crawl from the configured entrypoint
/// 3. Close the browser, even if the crawl failed
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `cancel` - Token that stops the crawl before its next navigation
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ended; see the report for its outcome
/// * `Err(MirrorError)` - Invalid entrypoint or browser failure
pub async fn crawl(config: &Config, cancel: CancellationToken) -> Result<CrawlReport, MirrorError> {
    let entrypoint = crate::url::parse_entrypoint(&config.crawl.entrypoint)?;
    let browser = ChromiumBrowser::launch(&config.browser).await?;

    let result = match browser.new_page().await {
        Ok(page) => {
            let mut coordinator =
                Coordinator::new(&page, CrawlOptions::from(config)).with_cancellation(cancel);
            coordinator.run(&entrypoint).await
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser cleanly: {}", e);
    }

    result
}
