use crate::browser::WaitCondition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlSettings,
    pub output: OutputSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
}

impl Config {
    /// Builds a configuration with defaults for everything but the
    /// entrypoint and output directory
    pub fn new(entrypoint: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            crawl: CrawlSettings {
                entrypoint: entrypoint.into(),
                wait_until: WaitCondition::default(),
                navigation_timeout_ms: None,
                same_origin_only: true,
                on_failure: FailurePolicy::default(),
            },
            output: OutputSettings {
                directory: directory.into(),
                report_path: None,
                json_report_path: None,
            },
            browser: BrowserSettings::default(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// URL the crawl starts from; its origin bounds the whole crawl
    #[serde(default)]
    pub entrypoint: String,

    /// Load milestone each navigation waits for
    #[serde(rename = "wait-until", default)]
    pub wait_until: WaitCondition,

    /// Per-navigation timeout (milliseconds); no timeout when absent
    #[serde(rename = "navigation-timeout-ms", default)]
    pub navigation_timeout_ms: Option<u64>,

    /// Only same-origin resources are mirrored; must be true
    #[serde(rename = "same-origin-only", default = "default_true")]
    pub same_origin_only: bool,

    /// What to do when a target or file fails
    #[serde(rename = "on-failure", default)]
    pub on_failure: FailurePolicy,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    /// Directory the mirror is written into
    pub directory: String,

    /// Path for a markdown crawl report
    #[serde(rename = "report-path", default)]
    pub report_path: Option<String>,

    /// Path for a JSON crawl report
    #[serde(rename = "json-report-path", default)]
    pub json_report_path: Option<String>,
}

/// Browser launch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// Run without a visible window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Path to the browser executable; discovered automatically when absent
    #[serde(default)]
    pub executable: Option<String>,

    /// Extra command line arguments passed to the browser
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            args: Vec::new(),
        }
    }
}

/// How the crawl reacts to a failed navigation, body fetch, or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure and carry on with the remaining targets
    #[default]
    Continue,
    /// Stop the crawl at the first failure
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

fn default_true() -> bool {
    true
}
