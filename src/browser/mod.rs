//! Browser abstraction for driving page loads
//!
//! Defines the `Browser` and `PageSession` traits the crawler consumes. The
//! crawler never talks to a browser protocol directly: it navigates, listens
//! to response notifications, fetches bodies by exchange id, and evaluates
//! one script per page, all through `PageSession`.

pub mod chromium;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::url::ContentKind;

/// Errors raised by a browser implementation
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser connection closed: {0}")]
    Closed(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Failed to fetch response body for exchange {exchange}: {message}")]
    Fetch { exchange: String, message: String },

    #[error("Script evaluation failed: {0}")]
    Evaluate(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl BrowserError {
    /// Returns true if the browser itself is gone and no further page work
    /// can succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Launch(_) | Self::Closed(_))
    }
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Opaque identifier correlating a response notification with its body
///
/// Only valid until the next navigation starts on the same page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A network response notification delivered during a navigation
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    /// Final URL of the response
    pub url: String,

    /// Transport protocol as reported by the browser (`http/1.1`, `h2`, ...)
    pub protocol: Option<String>,

    /// Declared content kind
    pub kind: ContentKind,

    /// MIME type as reported by the browser
    pub mime_type: String,

    /// Handle used to retrieve the body
    pub exchange: ExchangeId,
}

/// Stream of response notifications for one page
pub type ResponseEvents = BoxStream<'static, ResponseEvent>;

/// A retrieved response body
#[derive(Debug, Clone)]
pub struct ResponseBody {
    /// Body as delivered by the browser
    pub body: String,

    /// True if `body` is base64 encoded binary content
    pub base64_encoded: bool,
}

/// Load milestone a navigation waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitCondition {
    /// The page `load` event: all subresources of the initial document loaded
    #[default]
    Load,
    /// `DOMContentLoaded`: the document is parsed, subresources may be pending
    DomContentLoaded,
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::DomContentLoaded => write!(f, "dom-content-loaded"),
        }
    }
}

impl std::str::FromStr for WaitCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load" => Ok(Self::Load),
            "dom-content-loaded" | "domcontentloaded" => Ok(Self::DomContentLoaded),
            other => Err(format!(
                "unknown wait condition '{}', expected 'load' or 'dom-content-loaded'",
                other
            )),
        }
    }
}

/// A browser engine that can open pages
#[async_trait]
pub trait Browser: Send + Sync {
    /// Page type produced by this browser
    type Page: PageSession;

    /// Opens a new page (tab)
    async fn new_page(&self) -> BrowserResult<Self::Page>;

    /// Shuts the browser down
    async fn close(self) -> BrowserResult<()>;
}

/// A single browser page driven by the crawler
///
/// All methods take `&self`; implementations serialize access internally if
/// their protocol requires it.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Enables network response notifications
    ///
    /// Must be called before the first navigation so no response is missed.
    async fn enable_network_capture(&self) -> BrowserResult<()>;

    /// Subscribes to response notifications
    ///
    /// Only responses delivered after this call appear in the stream. The
    /// stream is fed by the browser's own event delivery and buffers without
    /// bound, so a slow consumer never blocks the browser.
    async fn response_events(&self) -> BrowserResult<ResponseEvents>;

    /// Loads `url` and resolves once `wait` is reached
    async fn navigate(&self, url: &str, wait: WaitCondition) -> BrowserResult<()>;

    /// Retrieves the body of a response observed during the current navigation
    async fn fetch_response_body(&self, exchange: &ExchangeId) -> BrowserResult<ResponseBody>;

    /// Evaluates a script in the page and returns its JSON result
    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value>;
}
