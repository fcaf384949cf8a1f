use crate::url::ContentKind;
use crate::UrlError;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use url::Url;

/// File name used for documents served from directory-like URLs
pub const INDEX_DOCUMENT: &str = "index.html";

/// File name used for non-document resources served from directory-like URLs
pub const INDEX_ASSET: &str = "index";

/// Maps a remote URL to its canonical path inside the mirror directory
///
/// # Mapping Rules
///
/// | URL path    | Kind     | Local path              |
/// |-------------|----------|-------------------------|
/// | `/`         | Document | `<root>/index.html`     |
/// | `/about`    | Document | `<root>/about/index.html` |
/// | `/about/`   | Document | `<root>/about/index.html` |
/// | `/old.html` | Document | `<root>/old.html`       |
/// | `/app.js`   | Other    | `<root>/app.js`         |
/// | `/api/`     | Other    | `<root>/api/index`      |
///
/// Query strings and fragments are ignored, so `/data?id=1` and `/data?id=2`
/// share one local file and the last write wins.
///
/// Segments are percent-decoded. A segment that is not valid UTF-8 once
/// decoded, or that decodes to `.`, `..` or contains a path separator, is
/// rejected. No URL can address a file outside `root`, and undecodable
/// escapes never collapse onto one file.
///
/// # Arguments
///
/// * `root` - The mirror output directory
/// * `url` - The remote URL
/// * `kind` - The declared content kind of the response
///
/// # Returns
///
/// * `Ok(PathBuf)` - The local path, always beneath `root`
/// * `Err(UrlError)` - The URL has no hierarchical path or would escape `root`
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use url::Url;
/// use sumi_mirror::url::{resolve_local_path, ContentKind};
///
/// let root = Path::new("/srv/mirror");
/// let url = Url::parse("https://x/about").unwrap();
/// let path = resolve_local_path(root, &url, ContentKind::Document).unwrap();
/// assert_eq!(path, Path::new("/srv/mirror/about/index.html"));
/// ```
pub fn resolve_local_path(root: &Path, url: &Url, kind: ContentKind) -> Result<PathBuf, UrlError> {
    let raw_segments = url
        .path_segments()
        .ok_or_else(|| UrlError::Parse(format!("URL has no hierarchical path: {}", url)))?;

    let mut segments = Vec::new();
    for raw in raw_segments {
        segments.push(decode_segment(raw, url)?);
    }

    // `/about/` yields a trailing empty segment, `/` yields a single empty one
    let file_name = segments.pop().filter(|s| !s.is_empty());

    let mut path = root.to_path_buf();
    for dir in segments.iter().filter(|s| !s.is_empty()) {
        path.push(dir);
    }

    match (kind, file_name) {
        (ContentKind::Document, Some(name)) if looks_like_html_file(&name) => path.push(name),
        (ContentKind::Document, Some(name)) => {
            path.push(name);
            path.push(INDEX_DOCUMENT);
        }
        (ContentKind::Document, None) => path.push(INDEX_DOCUMENT),
        (ContentKind::Other, Some(name)) => path.push(name),
        (ContentKind::Other, None) => path.push(INDEX_ASSET),
    }

    Ok(path)
}

/// Decodes one path segment, rejecting anything that could escape the root
///
/// Segments whose escapes do not decode to UTF-8 are rejected too: a lossy
/// decode would map distinct URLs onto the same file.
fn decode_segment(raw: &str, url: &Url) -> Result<String, UrlError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| UrlError::UnsafePath(url.to_string()))?
        .into_owned();

    if decoded == "." || decoded == ".." || decoded.contains(['/', '\\', '\0']) {
        return Err(UrlError::UnsafePath(url.to_string()));
    }

    Ok(decoded)
}

/// Returns true if a final path segment already names an HTML file
fn looks_like_html_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}
