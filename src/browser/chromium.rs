//! Chromium-based browser using chromiumoxide.

use super::{
    Browser, BrowserError, BrowserResult, ExchangeId, PageSession, ResponseBody, ResponseEvent,
    ResponseEvents, WaitCondition,
};
use crate::config::BrowserSettings;
use crate::url::ContentKind;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams, RequestId, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::{future, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Environment variable that overrides Chromium discovery
pub const CHROMIUM_ENV: &str = "SUMI_MIRROR_CHROMIUM";

/// Finds the Chromium binary path
///
/// Lookup order: the configured path, the `SUMI_MIRROR_CHROMIUM` environment
/// variable, then well-known binary names on `PATH`. Returns `None` when
/// nothing is found, leaving detection to chromiumoxide.
pub fn find_chromium(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured.map(PathBuf::from) {
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("Configured browser executable {} does not exist", path.display());
    }

    if let Ok(p) = std::env::var(CHROMIUM_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Chromium browser driven over the DevTools protocol
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launches a Chromium instance
    ///
    /// # Arguments
    ///
    /// * `settings` - Browser section of the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ChromiumBrowser)` - Browser launched and its event handler running
    /// * `Err(BrowserError::Launch)` - Config rejected or process failed to start
    pub async fn launch(settings: &BrowserSettings) -> BrowserResult<Self> {
        let mut builder = BrowserConfig::builder();

        if let Some(path) = find_chromium(settings.executable.as_deref()) {
            tracing::debug!("Using browser executable {}", path.display());
            builder = builder.chrome_executable(path);
        }

        if !settings.headless {
            builder = builder.with_head();
        }

        for arg in &settings.args {
            builder = builder.arg(arg.as_str());
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler drives the websocket; every page event flows through it
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler error: {}", e);
                }
            }
        });

        tracing::info!("Browser launched (headless: {})", settings.headless);

        Ok(Self { browser, handler })
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    type Page = ChromiumPage;

    async fn new_page(&self) -> BrowserResult<ChromiumPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(map_cdp_error)?;

        Ok(ChromiumPage {
            page,
            loaders: Arc::new(Mutex::new(LoaderBook::default())),
        })
    }

    async fn close(self) -> BrowserResult<()> {
        let Self {
            mut browser,
            handler,
        } = self;

        let closed = browser.close().await.map(|_| ()).map_err(map_cdp_error);
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process wait failed: {}", e);
        }
        handler.abort();

        tracing::info!("Browser closed");
        closed
    }
}

/// Document loaders seen on one page
///
/// Every response and lifecycle event carries the loader of the document that
/// issued it. When a new navigation starts, every loader seen so far is
/// retired, so late responses and milestones of earlier documents (post-load
/// fetches, abandoned timed-out loads) are never attributed to it.
#[derive(Debug, Default)]
struct LoaderBook {
    current: HashSet<String>,
    retired: HashSet<String>,
}

impl LoaderBook {
    /// Retires every loader seen so far
    fn retire_all(&mut self) {
        let current = std::mem::take(&mut self.current);
        self.retired.extend(current);
    }

    /// Records a loader seen in an event; returns false if it is retired
    ///
    /// Events without a loader (service workers, preflights) are admitted.
    fn observe(&mut self, loader: &str) -> bool {
        if loader.is_empty() {
            return true;
        }
        if self.retired.contains(loader) {
            return false;
        }
        self.current.insert(loader.to_string());
        true
    }

    fn is_retired(&self, loader: &str) -> bool {
        self.retired.contains(loader)
    }
}

/// The document a `Page.navigate` committed to
#[derive(Debug, Clone, PartialEq, Eq)]
struct Committed {
    frame: String,
    loader: Option<String>,
}

impl Committed {
    /// Returns true if a lifecycle event is this navigation's milestone
    ///
    /// Without a loader id (same-document navigation) any milestone of the
    /// main frame from a live loader counts.
    fn is_milestone(
        &self,
        book: &LoaderBook,
        frame: &str,
        loader: &str,
        name: &str,
        wait: WaitCondition,
    ) -> bool {
        if name != lifecycle_name(wait) || frame != self.frame {
            return false;
        }
        match &self.loader {
            Some(expected) => expected == loader,
            None => !book.is_retired(loader),
        }
    }
}

/// CDP lifecycle event name for a wait condition
fn lifecycle_name(wait: WaitCondition) -> &'static str {
    match wait {
        WaitCondition::Load => "load",
        WaitCondition::DomContentLoaded => "DOMContentLoaded",
    }
}

fn lock(book: &Mutex<LoaderBook>) -> MutexGuard<'_, LoaderBook> {
    book.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single Chromium tab
pub struct ChromiumPage {
    page: Page,
    loaders: Arc<Mutex<LoaderBook>>,
}

impl ChromiumPage {
    /// Issues `Page.navigate` and surfaces network-level failures
    ///
    /// Loaders of earlier documents are retired first; the new document's
    /// loader is recorded once the navigation commits.
    async fn start_navigation(&self, url: &str) -> BrowserResult<Committed> {
        lock(&self.loaders).retire_all();

        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| match map_cdp_error(e) {
                fatal @ BrowserError::Closed(_) => fatal,
                other => BrowserError::Navigation {
                    url: url.to_string(),
                    message: other.to_string(),
                },
            })?;

        let returns = &response.result;
        if let Some(message) = &returns.error_text {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: message.clone(),
            });
        }

        let committed = Committed {
            frame: returns.frame_id.inner().clone(),
            loader: returns.loader_id.as_ref().map(|l| l.inner().clone()),
        };
        if let Some(loader) = &committed.loader {
            lock(&self.loaders).observe(loader);
        }
        tracing::trace!("Navigation to {} committed as {:?}", url, committed);

        Ok(committed)
    }
}

#[async_trait]
impl PageSession for ChromiumPage {
    async fn enable_network_capture(&self) -> BrowserResult<()> {
        self.page
            .execute(EnableParams::default())
            .await
            .map_err(map_cdp_error)?;
        self.page
            .execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(map_cdp_error)?;
        Ok(())
    }

    async fn response_events(&self) -> BrowserResult<ResponseEvents> {
        // A new subscription starts a new capture; nothing buffered from
        // earlier documents may reach it
        lock(&self.loaders).retire_all();

        let events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(map_cdp_error)?;

        let loaders = Arc::clone(&self.loaders);
        Ok(events
            .filter(move |event| {
                let live = lock(&loaders).observe(event.loader_id.inner());
                if !live {
                    tracing::trace!("Dropping late response {}", event.response.url);
                }
                future::ready(live)
            })
            .map(|event| to_response_event(&event))
            .boxed())
    }

    async fn navigate(&self, url: &str, wait: WaitCondition) -> BrowserResult<()> {
        // Subscribe before navigating so the milestone cannot be missed
        let mut lifecycle = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(map_cdp_error)?;

        let committed = self.start_navigation(url).await?;

        while let Some(event) = lifecycle.next().await {
            let reached = {
                let book = lock(&self.loaders);
                committed.is_milestone(
                    &book,
                    event.frame_id.inner(),
                    event.loader_id.inner(),
                    &event.name,
                    wait,
                )
            };
            if reached {
                return Ok(());
            }
        }

        Err(BrowserError::Closed(format!(
            "page event stream ended while waiting for {}",
            wait
        )))
    }

    async fn fetch_response_body(&self, exchange: &ExchangeId) -> BrowserResult<ResponseBody> {
        let params = GetResponseBodyParams::new(RequestId::new(exchange.as_str()));
        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| match map_cdp_error(e) {
                fatal @ BrowserError::Closed(_) => fatal,
                other => BrowserError::Fetch {
                    exchange: exchange.to_string(),
                    message: other.to_string(),
                },
            })?;

        let returns = response.result;
        Ok(ResponseBody {
            body: returns.body,
            base64_encoded: returns.base64_encoded,
        })
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value> {
        let result = self
            .page
            .evaluate_expression(script)
            .await
            .map_err(|e| match map_cdp_error(e) {
                fatal @ BrowserError::Closed(_) => fatal,
                other => BrowserError::Evaluate(other.to_string()),
            })?;

        result
            .into_value()
            .map_err(|e| BrowserError::Evaluate(format!("failed to convert JS result: {e}")))
    }
}

fn to_response_event(event: &EventResponseReceived) -> ResponseEvent {
    let kind = if event.r#type == ResourceType::Document {
        ContentKind::Document
    } else {
        ContentKind::Other
    };

    ResponseEvent {
        url: event.response.url.clone(),
        protocol: event.response.protocol.clone(),
        kind,
        mime_type: event.response.mime_type.clone(),
        exchange: ExchangeId::new(event.request_id.inner().clone()),
    }
}

/// Separates a dead browser connection from ordinary command failures
fn map_cdp_error(e: CdpError) -> BrowserError {
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) => BrowserError::Closed(e.to_string()),
        other => BrowserError::Protocol(other.to_string()),
    }
}
