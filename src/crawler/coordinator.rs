//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that drives one browser page through
//! the site:
//! - Navigating each target and capturing its responses
//! - Writing captured bodies before the next navigation invalidates them
//! - Extracting links and scheduling unvisited same-origin targets
//! - Applying the failure policy and honoring cancellation

use crate::browser::{BrowserError, PageSession};
use crate::config::FailurePolicy;
use crate::crawler::capture::CaptureBridge;
use crate::crawler::links::extract_links;
use crate::crawler::materializer::{materialize, MaterializeError};
use crate::crawler::report::{CrawlOutcome, CrawlReport, FailureKind};
use crate::crawler::visited::VisitedSet;
use crate::crawler::CrawlOptions;
use crate::url::{resolve_link, resolve_local_path, same_origin, ContentKind};
use crate::{MirrorError, UrlError};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A page scheduled for navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// The URL to navigate to
    pub url: Url,

    /// Local path claimed for the page's document
    pub path: PathBuf,
}

/// What to do after a target has been processed
enum Step {
    /// Continue with these newly discovered targets, in discovery order
    Continue(Vec<CrawlTarget>),
    /// Stop the crawl under the abort policy
    Abort,
}

/// Main crawler coordinator structure
///
/// Owns the crawl-wide [`VisitedSet`] and drives a single page. Targets are
/// processed strictly one at a time in depth-first pre-order: a page's own
/// files are written, then every page it links to (and everything below
/// those) is finished before the page's next sibling starts.
pub struct Coordinator<'p, P: PageSession + ?Sized> {
    page: &'p P,
    options: CrawlOptions,
    visited: VisitedSet,
    cancel: CancellationToken,
}

impl<'p, P: PageSession + ?Sized> Coordinator<'p, P> {
    /// Creates a new coordinator driving `page`
    pub fn new(page: &'p P, options: CrawlOptions) -> Self {
        Self {
            page,
            options,
            visited: VisitedSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Paths claimed so far
    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Runs the crawl loop from `entrypoint`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl ended (completed, cancelled or aborted)
    /// * `Err(MirrorError)` - The entrypoint cannot be mapped, or the browser died
    pub async fn run(&mut self, entrypoint: &Url) -> Result<CrawlReport, MirrorError> {
        let root = self.options.output_directory.clone();
        let mut report = CrawlReport::new(entrypoint.as_str(), &root);

        let entry_path = resolve_local_path(&root, entrypoint, ContentKind::Document)?;

        tracing::info!(
            "Mirroring {} into {} (wait until {}, on failure {})",
            entrypoint,
            root.display(),
            self.options.wait_condition,
            self.options.on_failure
        );

        self.page.enable_network_capture().await?;

        self.visited.claim(entry_path.clone());
        let mut worklist = vec![CrawlTarget {
            url: entrypoint.clone(),
            path: entry_path,
        }];

        let start_time = std::time::Instant::now();

        while let Some(target) = worklist.pop() {
            if self.cancel.is_cancelled() {
                tracing::info!(
                    "Crawl cancelled with {} targets still queued",
                    worklist.len() + 1
                );
                report.finish(CrawlOutcome::Cancelled);
                return Ok(report);
            }

            match self.process_target(entrypoint, &target, &mut report).await? {
                Step::Continue(children) => {
                    // Reversed so the first discovered link is popped next
                    worklist.extend(children.into_iter().rev());
                }
                Step::Abort => {
                    tracing::error!("Aborting crawl after failure at {}", target.url);
                    report.finish(CrawlOutcome::Aborted);
                    return Ok(report);
                }
            }

            if report.pages_visited > 0 && report.pages_visited % 10 == 0 {
                tracing::info!(
                    "Progress: {} pages visited, {} files written, {} queued, {:.2} pages/sec",
                    report.pages_visited,
                    report.assets_written,
                    worklist.len(),
                    report.pages_visited as f64 / start_time.elapsed().as_secs_f64()
                );
            }
        }

        report.finish(CrawlOutcome::Completed);
        tracing::info!(
            "Crawl completed: {} pages visited, {} files written, {} failures in {:?}",
            report.pages_visited,
            report.assets_written,
            report.failure_count(),
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Navigates one target, writes its responses, and discovers its links
    async fn process_target(
        &mut self,
        origin: &Url,
        target: &CrawlTarget,
        report: &mut CrawlReport,
    ) -> Result<Step, MirrorError> {
        tracing::debug!("Navigating to {}", target.url);

        let events = self.page.response_events().await?;
        let mut bridge = CaptureBridge::new(
            target.url.clone(),
            target.path.clone(),
            self.options.output_directory.clone(),
            events,
        );

        let page = self.page;
        let url = target.url.as_str();
        let wait = self.options.wait_condition;
        let timeout = self.options.navigation_timeout;
        let navigation = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, page.navigate(url, wait))
                    .await
                    .unwrap_or_else(|_| {
                        Err(BrowserError::NavigationTimeout {
                            url: url.to_string(),
                            timeout: limit,
                        })
                    }),
                None => page.navigate(url, wait).await,
            }
        };

        let navigated = bridge.capture_during(navigation, &mut self.visited).await;
        let (ledger, unresolvable) = bridge.finish();

        for (url, error) in unresolvable {
            report.record_failure(FailureKind::InvalidUrl, url, None, error.to_string());
        }

        let mut abort = false;
        let navigation_failed = match navigated {
            Ok(()) => {
                report.record_page();
                false
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                let kind = match &e {
                    BrowserError::NavigationTimeout { .. } => FailureKind::NavigationTimeout,
                    _ => FailureKind::NavigationError,
                };
                report.record_failure(
                    kind,
                    target.url.as_str(),
                    Some(target.path.as_path()),
                    e.to_string(),
                );
                abort |= self.should_abort(kind);
                true
            }
        };

        // Bodies must be read before the next navigation invalidates them.
        // Every claimed response is written or reported, even when aborting.
        for record in ledger {
            match materialize(self.page, &record).await {
                Ok(bytes) => report.record_written(&record.path, bytes),
                Err(e) => {
                    let e = match e.into_fatal() {
                        Ok(fatal) => return Err(fatal.into()),
                        Err(e) => e,
                    };
                    let kind = match &e {
                        MaterializeError::Write { .. } => FailureKind::WriteFailed,
                        MaterializeError::Fetch { .. } | MaterializeError::Decode { .. } => {
                            FailureKind::FetchFailed
                        }
                    };
                    report.record_failure(
                        kind,
                        record.url.as_str(),
                        Some(record.path.as_path()),
                        e.to_string(),
                    );
                    abort |= self.should_abort(kind);
                }
            }
        }

        if abort {
            return Ok(Step::Abort);
        }
        if navigation_failed {
            return Ok(Step::Continue(Vec::new()));
        }

        let children = match self.discover(origin, target, report).await {
            Ok(children) => children,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                report.record_failure(
                    FailureKind::ExtractFailed,
                    target.url.as_str(),
                    Some(target.path.as_path()),
                    e.to_string(),
                );
                if self.should_abort(FailureKind::ExtractFailed) {
                    return Ok(Step::Abort);
                }
                Vec::new()
            }
        };

        Ok(Step::Continue(children))
    }

    /// Extracts links from the loaded page and claims unvisited targets
    ///
    /// A link is claimed at discovery time, so two pages linking to the same
    /// third page schedule it only once.
    async fn discover(
        &mut self,
        origin: &Url,
        target: &CrawlTarget,
        report: &mut CrawlReport,
    ) -> Result<Vec<CrawlTarget>, BrowserError> {
        let links = extract_links(self.page).await?;

        let base = links
            .base
            .as_deref()
            .and_then(|b| Url::parse(b).ok())
            .filter(|b| matches!(b.scheme(), "http" | "https"))
            .unwrap_or_else(|| target.url.clone());

        let root = &self.options.output_directory;
        let mut children = Vec::new();

        for href in &links.hrefs {
            let url = match resolve_link(&base, href) {
                Ok(url) => url,
                Err(UrlError::InvalidScheme(_)) => {
                    tracing::trace!("Ignoring non-HTTP link {}", href);
                    continue;
                }
                Err(e) => {
                    report.record_failure(
                        FailureKind::InvalidUrl,
                        href.as_str(),
                        None,
                        e.to_string(),
                    );
                    continue;
                }
            };

            if !same_origin(&url, origin) {
                tracing::debug!("Skipping cross-origin link {}", url);
                report.record_cross_origin(url.as_str());
                continue;
            }

            let path = match resolve_local_path(root, &url, ContentKind::Document) {
                Ok(path) => path,
                Err(e) => {
                    report.record_failure(
                        FailureKind::InvalidUrl,
                        url.as_str(),
                        None,
                        e.to_string(),
                    );
                    continue;
                }
            };

            // Links to files already captured as subresources (stylesheets,
            // icons...) are not navigated again
            let captured_as_asset = resolve_local_path(root, &url, ContentKind::Other)
                .map(|asset| self.visited.contains(&asset))
                .unwrap_or(false);
            if captured_as_asset {
                tracing::trace!("Link {} already captured as an asset", url);
                continue;
            }

            if self.visited.claim(path.clone()) {
                tracing::debug!("Discovered {} -> {}", url, path.display());
                children.push(CrawlTarget { url, path });
            }
        }

        tracing::debug!(
            "{}: {} links, {} new targets",
            target.url,
            links.hrefs.len(),
            children.len()
        );

        Ok(children)
    }

    fn should_abort(&self, kind: FailureKind) -> bool {
        self.options.on_failure == FailurePolicy::Abort && kind.triggers_abort()
    }
}

/// Mirrors a site by driving `page` from `entrypoint`
///
/// This is the main entry point for running a crawl against an already open
/// page. It will:
/// 1. Parse the entrypoint
/// 2. Enable network capture on the page
/// 3. Navigate, capture and write every reachable same-origin page
/// 4. Return the crawl report
///
/// # Arguments
///
/// * `page` - An open browser page; it is reused for every navigation
/// * `entrypoint` - Absolute URL to start from
/// * `options` - Crawl options, including the output directory
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ended; per-file failures are in the report
/// * `Err(MirrorError)` - Invalid entrypoint or browser failure
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::browser::chromium::ChromiumBrowser;
/// use sumi_mirror::browser::Browser;
/// use sumi_mirror::config::BrowserSettings;
/// use sumi_mirror::crawler::{run_crawl, CrawlOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let browser = ChromiumBrowser::launch(&BrowserSettings::default()).await?;
/// let page = browser.new_page().await?;
/// let report = run_crawl(&page, "http://localhost:5126/", CrawlOptions::new("./mirror")).await?;
/// println!("{} files written", report.assets_written);
/// browser.close().await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<P>(
    page: &P,
    entrypoint: &str,
    options: CrawlOptions,
) -> Result<CrawlReport, MirrorError>
where
    P: PageSession + ?Sized,
{
    let entrypoint = crate::url::parse_entrypoint(entrypoint)?;
    let mut coordinator = Coordinator::new(page, options);
    coordinator.run(&entrypoint).await
}
