//! URL handling module for Sumi-Mirror
//!
//! This module provides link resolution, origin comparison, and the mapping
//! from remote URLs to paths inside the mirror directory.

mod normalize;
mod resolve;

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

// Re-export main functions
pub use normalize::{parse_entrypoint, resolve_link};
pub use resolve::resolve_local_path;

/// Declared content kind of a captured response
///
/// Documents are mirrored as `index.html` files beneath directory-like paths,
/// everything else mirrors the URL path as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    /// An HTML document (a navigation target or frame)
    Document,
    /// Any other resource: stylesheets, scripts, images, fetches...
    Other,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Returns true if both URLs share scheme, host and port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::same_origin;
///
/// let a = Url::parse("https://example.com/a").unwrap();
/// let b = Url::parse("https://example.com:443/b?q=1").unwrap();
/// let c = Url::parse("http://example.com/a").unwrap();
/// assert!(same_origin(&a, &b));
/// assert!(!same_origin(&a, &c));
/// ```
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
