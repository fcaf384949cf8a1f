//! Capture bridge - correlates response notifications with one navigation
//!
//! The bridge consumes the page's response notifications while a navigation
//! is in flight, keeps only same-origin HTTP responses whose local path has
//! not been claimed yet, and records them in a per-navigation ledger that is
//! drained once the navigation settles.

use crate::browser::{ExchangeId, ResponseEvent, ResponseEvents};
use crate::crawler::visited::VisitedSet;
use crate::url::{resolve_local_path, same_origin, ContentKind};
use crate::UrlError;
use futures::{FutureExt, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use url::Url;

/// A captured response waiting to be written
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    /// Remote URL of the response
    pub url: Url,

    /// Declared content kind
    pub kind: ContentKind,

    /// MIME type reported by the browser
    pub mime_type: String,

    /// Handle used to fetch the body
    pub exchange: ExchangeId,

    /// Canonical local path the body is written to
    pub path: PathBuf,
}

/// Responses captured during one navigation, in the order they were observed
///
/// Each local path appears at most once.
#[derive(Debug, Default)]
pub struct ResponseLedger {
    records: Vec<ResponseRecord>,
}

impl ResponseLedger {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the record claimed for a local path
    pub fn get(&self, path: &Path) -> Option<&ResponseRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseRecord> {
        self.records.iter()
    }

    fn push(&mut self, record: ResponseRecord) {
        self.records.push(record);
    }
}

impl IntoIterator for ResponseLedger {
    type Item = ResponseRecord;
    type IntoIter = std::vec::IntoIter<ResponseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Why a response notification was not recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    /// Not delivered over HTTP (data:, blob:, browser-internal...)
    NotHttp,
    /// Different origin than the navigation target
    CrossOrigin,
    /// URL could not be mapped to a local path
    Unresolvable(UrlError),
    /// Local path already claimed in this crawl
    AlreadyClaimed,
}

/// Captures the responses of a single navigation
pub struct CaptureBridge {
    target: Url,
    root: PathBuf,
    /// Pre-claimed path of the navigation target, admitted once
    target_path: Option<PathBuf>,
    events: ResponseEvents,
    ledger: ResponseLedger,
    unresolvable: Vec<(String, UrlError)>,
}

impl CaptureBridge {
    /// Attaches a bridge to a navigation
    ///
    /// # Arguments
    ///
    /// * `target` - URL being navigated; its origin scopes the capture
    /// * `target_path` - Local path already claimed for the target document
    /// * `root` - Mirror output directory
    /// * `events` - Response notifications subscribed before navigating
    pub fn new(target: Url, target_path: PathBuf, root: PathBuf, events: ResponseEvents) -> Self {
        Self {
            target,
            root,
            target_path: Some(target_path),
            events,
            ledger: ResponseLedger::default(),
            unresolvable: Vec::new(),
        }
    }

    /// Runs `navigation` to completion while recording notifications
    ///
    /// Notifications are handled as they arrive, interleaved with the
    /// navigation on the current task. Once the navigation settles, any
    /// notifications already queued are handled before returning.
    pub async fn capture_during<F>(&mut self, navigation: F, visited: &mut VisitedSet) -> F::Output
    where
        F: Future,
    {
        tokio::pin!(navigation);

        loop {
            tokio::select! {
                biased;

                Some(event) = self.events.next() => {
                    let _ = self.observe(event, visited);
                }
                result = &mut navigation => {
                    self.drain_pending(visited);
                    return result;
                }
            }
        }
    }

    /// Handles notifications that are already queued without waiting
    pub fn drain_pending(&mut self, visited: &mut VisitedSet) {
        while let Some(Some(event)) = self.events.next().now_or_never() {
            let _ = self.observe(event, visited);
        }
    }

    /// Applies the capture policy to one notification
    ///
    /// # Policy
    ///
    /// 1. Drop non-HTTP transports
    /// 2. Drop responses from another origin
    /// 3. Resolve the local path
    /// 4. Drop responses whose path is already claimed (the target's own
    ///    pre-claimed path is admitted once)
    /// 5. Claim the path and record the response
    pub fn observe(
        &mut self,
        event: ResponseEvent,
        visited: &mut VisitedSet,
    ) -> Result<&ResponseRecord, Discard> {
        tracing::trace!(
            "Response {} ({}, {:?})",
            event.url,
            event.kind,
            event.protocol
        );

        if !is_http_protocol(event.protocol.as_deref()) {
            return Err(Discard::NotHttp);
        }

        let url = match Url::parse(&event.url) {
            Ok(url) => url,
            Err(e) => return Err(self.unresolvable(event.url, UrlError::Parse(e.to_string()))),
        };

        if !same_origin(&url, &self.target) {
            tracing::trace!("Ignoring cross-origin response {}", url);
            return Err(Discard::CrossOrigin);
        }

        let path = match resolve_local_path(&self.root, &url, event.kind) {
            Ok(path) => path,
            Err(e) => return Err(self.unresolvable(event.url, e)),
        };

        let admitted = if self.target_path.as_deref() == Some(path.as_path()) {
            self.target_path = None;
            true
        } else {
            visited.claim(path.clone())
        };

        if !admitted {
            tracing::debug!("Skipping duplicate response {} -> {}", url, path.display());
            return Err(Discard::AlreadyClaimed);
        }

        tracing::debug!("Captured {} -> {}", url, path.display());
        self.ledger.push(ResponseRecord {
            url,
            kind: event.kind,
            mime_type: event.mime_type,
            exchange: event.exchange,
            path,
        });

        // Just pushed
        Ok(&self.ledger.records[self.ledger.records.len() - 1])
    }

    /// Captured responses, in observation order
    pub fn ledger(&self) -> &ResponseLedger {
        &self.ledger
    }

    /// Ends the capture, returning the ledger and the URLs that could not be
    /// mapped to a local path
    pub fn finish(self) -> (ResponseLedger, Vec<(String, UrlError)>) {
        (self.ledger, self.unresolvable)
    }

    fn unresolvable(&mut self, url: String, error: UrlError) -> Discard {
        tracing::warn!("Cannot map response {} to a local path: {}", url, error);
        self.unresolvable.push((url, error.clone()));
        Discard::Unresolvable(error)
    }
}

/// Returns true for HTTP-family transports (`http/1.0`, `http/1.1`, `h2`, `h3`)
pub fn is_http_protocol(protocol: Option<&str>) -> bool {
    match protocol {
        Some(p) => {
            let p = p.to_ascii_lowercase();
            p.starts_with("http") || p == "h2" || p == "h2c" || p.starts_with("h3")
        }
        None => false,
    }
}
