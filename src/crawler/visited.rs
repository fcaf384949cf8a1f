//! Crawl-wide record of claimed local paths

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Set of local paths already claimed during one crawl
///
/// A path is claimed either when a captured response resolves to it or when a
/// discovered link is scheduled for navigation. Claims are never released, so
/// every local path is written by at most one response per crawl and every
/// page is navigated at most once, whatever cycles the link graph contains.
///
/// The only mutation is [`claim`](Self::claim), which inserts and reports
/// whether the path was absent as one step.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    paths: HashSet<PathBuf>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `path`, returning true only if nobody claimed it before
    pub fn claim(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    /// Returns true if `path` has been claimed
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
