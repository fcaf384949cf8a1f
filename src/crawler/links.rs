//! Link extraction from the live page
//!
//! Links are read from the rendered document rather than the raw HTML, so
//! anchors inserted by scripts during load are followed too.

use crate::browser::{BrowserError, BrowserResult, PageSession};
use serde::Deserialize;

/// Script returning the document base URL and the raw value of every `href`
/// attribute in the document
pub const HREF_QUERY: &str = "({ base: document.baseURI, \
     hrefs: Array.from(document.querySelectorAll('[href]'), el => el.getAttribute('href')) })";

/// Snapshot of the links present in a loaded page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    /// Base URL relative links resolve against (`<base href>` aware)
    pub base: Option<String>,

    /// Raw attribute values; may be relative, absolute, fragment-only or malformed
    pub hrefs: Vec<String>,
}

#[derive(Deserialize)]
struct RawPageLinks {
    base: Option<String>,
    #[serde(default)]
    hrefs: Vec<Option<String>>,
}

/// Queries the current document for hyperlink targets
///
/// # Returns
///
/// * `Ok(PageLinks)` - Snapshot of the document's `href` values, in document order
/// * `Err(BrowserError)` - The script failed or returned an unexpected shape
pub async fn extract_links<P>(page: &P) -> BrowserResult<PageLinks>
where
    P: PageSession + ?Sized,
{
    let value = page.evaluate(HREF_QUERY).await?;
    parse_page_links(value)
}

/// Converts the script result into [`PageLinks`]
pub fn parse_page_links(value: serde_json::Value) -> BrowserResult<PageLinks> {
    let raw: RawPageLinks = serde_json::from_value(value)
        .map_err(|e| BrowserError::Evaluate(format!("unexpected link query result: {}", e)))?;

    Ok(PageLinks {
        base: raw.base,
        hrefs: raw.hrefs.into_iter().flatten().collect(),
    })
}
