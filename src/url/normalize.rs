use crate::UrlError;
use url::Url;

/// Parses the crawl entrypoint
///
/// The entrypoint must be an absolute `http` or `https` URL with a host. Its
/// fragment is dropped since fragments never reach the network.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::parse_entrypoint;
///
/// let url = parse_entrypoint("http://localhost:5126/#intro").unwrap();
/// assert_eq!(url.as_str(), "http://localhost:5126/");
/// assert!(parse_entrypoint("localhost:5126").is_err());
/// ```
pub fn parse_entrypoint(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    ensure_crawlable(url)
}

/// Resolves a raw `href` attribute value against the page it was found on
///
/// # Resolution Steps
///
/// 1. Join the raw value against `base` (relative, absolute, protocol-relative
///    and fragment-only values are all accepted)
/// 2. Reject anything that is not `http` or `https` (`mailto:`,
///    `javascript:`, `data:`, ...)
/// 3. Require a host
/// 4. Drop the fragment
///
/// The query string is kept here; it is dropped later when the URL is mapped
/// to a local path.
///
/// # Arguments
///
/// * `base` - URL of the page the link was found on
/// * `href` - The raw attribute value
///
/// # Returns
///
/// * `Ok(Url)` - Absolute, fragment-free URL
/// * `Err(UrlError::InvalidScheme)` - A well-formed link to a non-HTTP scheme
/// * `Err(UrlError)` - Any other malformed link
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::resolve_link;
///
/// let base = Url::parse("https://example.com/docs/intro").unwrap();
/// let link = resolve_link(&base, "../about#team").unwrap();
/// assert_eq!(link.as_str(), "https://example.com/about");
/// ```
pub fn resolve_link(base: &Url, href: &str) -> Result<Url, UrlError> {
    let url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    ensure_crawlable(url)
}

fn ensure_crawlable(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}
