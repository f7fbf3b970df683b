//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! The media kind is decided once, here, in this order:
//!
//! 1. an explicit content-type override (trusted even when unsupported, so
//!    `text/plain` really means "not an essay document");
//! 2. the HTTP `Content-Type` of a download, when it names a supported type;
//! 3. the file extension of the path or URL;
//! 4. magic bytes (`%PDF`, JPEG SOI, PNG signature).

use crate::document::{Document, MediaKind};
use crate::error::EssayError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to an in-memory document.
///
/// `content_type` overrides every other kind signal. URL downloads are
/// bounded by `timeout_secs`.
pub async fn resolve_input(
    input: &str,
    content_type: Option<&str>,
    timeout_secs: u64,
) -> Result<Document, EssayError> {
    if is_url(input) {
        download_url(input, content_type, timeout_secs).await
    } else {
        read_local(input, content_type).await
    }
}

/// Pick the media kind from the available signals, strongest first.
pub fn detect_kind(
    declared: Option<&str>,
    served: Option<&str>,
    name_hint: Option<&Path>,
    bytes: &[u8],
) -> MediaKind {
    if let Some(ct) = declared {
        return MediaKind::from_mime(ct);
    }
    let candidates = [
        served.map(MediaKind::from_mime),
        name_hint.map(MediaKind::from_path),
        Some(MediaKind::sniff(bytes)),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|k| *k != MediaKind::Unknown)
        .unwrap_or(MediaKind::Unknown)
}

async fn read_local(path_str: &str, content_type: Option<&str>) -> Result<Document, EssayError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(EssayError::FileNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(EssayError::PermissionDenied { path });
        }
        Err(_) => return Err(EssayError::FileNotFound { path }),
    };

    let kind = detect_kind(content_type, None, Some(&path), &bytes);
    debug!(
        "Resolved local file {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        kind
    );
    Ok(Document::new(bytes, kind))
}

async fn download_url(
    url: &str,
    content_type: Option<&str>,
    timeout_secs: u64,
) -> Result<Document, EssayError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EssayError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let fail = |e: reqwest::Error| {
        if e.is_timeout() {
            EssayError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            EssayError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(fail)?;

    if !response.status().is_success() {
        return Err(EssayError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let served = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let name = url_file_name(url);

    let bytes = response.bytes().await.map_err(fail)?.to_vec();

    let kind = detect_kind(
        content_type,
        served.as_deref(),
        name.as_deref().map(Path::new),
        &bytes,
    );
    info!("Downloaded {} bytes ({})", bytes.len(), kind);
    Ok(Document::new(bytes, kind))
}

/// Last path segment of a URL, when it looks like a file name.
fn url_file_name(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty() && last.contains('.')).then(|| last.to_string())
}
