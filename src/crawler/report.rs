//! Crawl report - what a crawl wrote, skipped and failed on

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlOutcome {
    /// Still in progress
    Running,
    /// Every reachable target was processed
    Completed,
    /// Stopped between targets by the cancellation token
    Cancelled,
    /// Stopped at the first failure under the abort policy
    Aborted,
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Category of a per-target or per-file failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Malformed link or response URL; skipped
    InvalidUrl,
    /// Navigation did not reach its milestone in time
    NavigationTimeout,
    /// Navigation failed (network error, aborted load...)
    NavigationError,
    /// The in-page link query failed
    ExtractFailed,
    /// Body retrieval or decoding failed
    FetchFailed,
    /// Directory creation or file write failed
    WriteFailed,
}

impl FailureKind {
    /// Returns true if the abort policy stops the crawl on this kind
    ///
    /// Invalid URLs are always just skipped.
    pub fn triggers_abort(&self) -> bool {
        !matches!(self, Self::InvalidUrl)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidUrl => "invalid-url",
            Self::NavigationTimeout => "navigation-timeout",
            Self::NavigationError => "navigation-error",
            Self::ExtractFailed => "extract-failed",
            Self::FetchFailed => "fetch-failed",
            Self::WriteFailed => "write-failed",
        };
        f.write_str(name)
    }
}

/// A failure attributed to a specific URL and, where known, local path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlFailure {
    pub url: String,
    pub path: Option<PathBuf>,
    pub kind: FailureKind,
    pub message: String,
}

/// Summary of one crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    /// URL the crawl started from
    pub entrypoint: String,

    /// Directory the mirror was written into
    pub output_directory: PathBuf,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: CrawlOutcome,

    /// Targets whose navigation reached its milestone
    pub pages_visited: u64,

    /// Files written, documents included
    pub assets_written: u64,

    /// Total bytes written
    pub bytes_written: u64,

    /// Written paths, in write order
    pub written: Vec<PathBuf>,

    /// Every failure, in the order it happened
    pub failures: Vec<CrawlFailure>,

    /// Distinct cross-origin links that were not followed
    pub skipped_cross_origin: BTreeSet<String>,
}

impl CrawlReport {
    /// Starts an empty report
    pub fn new(entrypoint: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            output_directory: output_directory.into(),
            started_at: Utc::now(),
            finished_at: None,
            outcome: CrawlOutcome::Running,
            pages_visited: 0,
            assets_written: 0,
            bytes_written: 0,
            written: Vec::new(),
            failures: Vec::new(),
            skipped_cross_origin: BTreeSet::new(),
        }
    }

    pub fn record_page(&mut self) {
        self.pages_visited += 1;
    }

    pub fn record_written(&mut self, path: &Path, bytes: u64) {
        self.assets_written += 1;
        self.bytes_written += bytes;
        self.written.push(path.to_path_buf());
    }

    pub fn record_failure(
        &mut self,
        kind: FailureKind,
        url: impl Into<String>,
        path: Option<&Path>,
        message: impl Into<String>,
    ) {
        let failure = CrawlFailure {
            url: url.into(),
            path: path.map(Path::to_path_buf),
            kind,
            message: message.into(),
        };
        tracing::warn!("{} for {}: {}", failure.kind, failure.url, failure.message);
        self.failures.push(failure);
    }

    /// Records a cross-origin link; repeated links are kept once
    pub fn record_cross_origin(&mut self, url: impl Into<String>) {
        self.skipped_cross_origin.insert(url.into());
    }

    /// Marks the report as finished
    pub fn finish(&mut self, outcome: CrawlOutcome) {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Failures of one kind
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &CrawlFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    /// Percentage of captured files that were written successfully
    pub fn success_rate(&self) -> f64 {
        let file_failures = self
            .failures
            .iter()
            .filter(|f| matches!(f.kind, FailureKind::FetchFailed | FailureKind::WriteFailed))
            .count() as u64;
        let attempted = self.assets_written + file_failures;

        if attempted == 0 {
            0.0
        } else {
            (self.assets_written as f64 / attempted as f64) * 100.0
        }
    }

    /// Duration in whole seconds, once finished
    pub fn duration_seconds(&self) -> Option<u64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds().max(0) as u64)
    }

    /// First failure that made the crawl stop, if it was aborted
    pub fn abort_cause(&self) -> Option<&CrawlFailure> {
        if self.outcome != CrawlOutcome::Aborted {
            return None;
        }
        self.failures.iter().rev().find(|f| f.kind.triggers_abort())
    }
}
