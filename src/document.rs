//! The immutable document payload that enters the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Declared media kind of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Pdf,
    Jpeg,
    Png,
    Unknown,
}

impl MediaKind {
    /// Map a MIME content type. Parameters such as `; charset=…` are ignored.
    pub fn from_mime(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => MediaKind::Pdf,
            "image/jpeg" => MediaKind::Jpeg,
            "image/png" => MediaKind::Png,
            _ => MediaKind::Unknown,
        }
    }

    /// Guess from a file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => MediaKind::Pdf,
            Some("jpg") | Some("jpeg") => MediaKind::Jpeg,
            Some("png") => MediaKind::Png,
            _ => MediaKind::Unknown,
        }
    }

    /// Guess from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            MediaKind::Pdf
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            MediaKind::Jpeg
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            MediaKind::Png
        } else {
            MediaKind::Unknown
        }
    }

    /// The canonical MIME type, or `None` for [`MediaKind::Unknown`].
    pub fn mime(&self) -> Option<&'static str> {
        match self {
            MediaKind::Pdf => Some("application/pdf"),
            MediaKind::Jpeg => Some("image/jpeg"),
            MediaKind::Png => Some("image/png"),
            MediaKind::Unknown => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MediaKind::Jpeg | MediaKind::Png)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime().unwrap_or("unknown"))
    }
}

/// Raw bytes plus their declared media kind. Never mutated after creation.
#[derive(Clone)]
pub struct Document {
    bytes: Vec<u8>,
    kind: MediaKind,
}

impl Document {
    pub fn new(bytes: impl Into<Vec<u8>>, kind: MediaKind) -> Self {
        Self {
            bytes: bytes.into(),
            kind,
        }
    }

    /// Build a document from a declared content type such as `image/png`.
    pub fn from_content_type(bytes: impl Into<Vec<u8>>, content_type: &str) -> Self {
        Self::new(bytes, MediaKind::from_mime(content_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}
