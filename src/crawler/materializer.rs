//! Asset materializer - writes captured response bodies to disk

use crate::browser::{BrowserError, PageSession, ResponseBody};
use crate::crawler::capture::ResponseRecord;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while materializing one response
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Failed to fetch body for {url}: {source}")]
    Fetch { url: String, source: BrowserError },

    #[error("Failed to decode body for {url}: {source}")]
    Decode {
        url: String,
        source: base64::DecodeError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MaterializeError {
    /// Returns true if the browser is gone, not just this body
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fetch { source, .. } if source.is_fatal())
    }

    /// Splits off a fatal browser error, handing back anything else
    pub fn into_fatal(self) -> Result<BrowserError, Self> {
        match self {
            Self::Fetch { source, .. } if source.is_fatal() => Ok(source),
            other => Err(other),
        }
    }
}

/// Fetches, decodes and writes the body of one captured response
///
/// Parent directories are created as needed and an existing file at the
/// destination is replaced.
///
/// # Arguments
///
/// * `page` - The page the response was captured on; its current navigation
///   must still be the one that produced the response
/// * `record` - The captured response
///
/// # Returns
///
/// * `Ok(u64)` - Number of bytes written
/// * `Err(MaterializeError)` - Fetch, decode, or write failed for this file
pub async fn materialize<P>(page: &P, record: &ResponseRecord) -> Result<u64, MaterializeError>
where
    P: PageSession + ?Sized,
{
    let body = page
        .fetch_response_body(&record.exchange)
        .await
        .map_err(|source| MaterializeError::Fetch {
            url: record.url.to_string(),
            source,
        })?;

    let bytes = decode_body(body).map_err(|source| MaterializeError::Decode {
        url: record.url.to_string(),
        source,
    })?;

    write_file(&record.path, &bytes).await?;

    tracing::debug!(
        "Wrote {} ({} bytes, {})",
        record.path.display(),
        bytes.len(),
        record.mime_type
    );

    Ok(bytes.len() as u64)
}

/// Decodes a body as delivered by the browser
pub fn decode_body(body: ResponseBody) -> Result<Vec<u8>, base64::DecodeError> {
    if body.base64_encoded {
        STANDARD.decode(body.body.as_bytes())
    } else {
        Ok(body.body.into_bytes())
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), MaterializeError> {
    let write_error = |source| MaterializeError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    tokio::fs::write(path, bytes).await.map_err(write_error)
}
