//! Error types for the edgequake-essay2txt library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`EssayError`] — **Fatal**: extraction cannot run at all (input missing,
//!   provider not configured, pdfium library unavailable) or the caller asked
//!   us to reject a result that carries too little text. Returned as
//!   `Err(EssayError)` from the top-level `extract*` functions.
//!
//! * [`ReviewError`] — a scoring or grammar-rewrite round trip failed. The
//!   `Interpretation` variant keeps the raw response so a malformed answer is
//!   never silently turned into a score.
//!
//! Transcription and image-decoding failures are *not* errors at all: an
//! engine that fails yields the empty string and a corrupt image passes
//! through the normaliser unchanged. Those paths are logged with `warn!`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-essay2txt library.
#[derive(Debug, Error)]
pub enum EssayError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The extracted text is too short to be an essay.
    ///
    /// The message is user facing and asks for a clearer submission.
    #[error("Não foi possível extrair texto da redação ({found} caracteres úteis, mínimo {required}). Envie uma imagem mais nítida ou um PDF com texto.")]
    InsufficientText { found: usize, required: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt, encrypted, or has no pages.
    ///
    /// The classifier downgrades this to an empty, unreadable result.
    #[error("PDF could not be opened: {detail}")]
    CorruptPdf { detail: String },

    /// pdfium returned an error while rendering the first page.
    #[error("Rasterisation failed: {detail}")]
    RasterisationFailed { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium, pass --pdfium-lib,\n\
or install libpdfium where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a scoring or grammar-rewrite round trip.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ReviewError {
    /// The provider call itself failed (network, rate limit, rejection).
    #[error("LLM call failed: {message}")]
    Provider { message: String },

    /// The provider answered, but the answer could not be interpreted.
    #[error("Falha ao interpretar a resposta: {message}")]
    Interpretation {
        message: String,
        raw_response: String,
    },
}

impl ReviewError {
    /// The raw provider response, when the failure happened after one arrived.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ReviewError::Provider { .. } => None,
            ReviewError::Interpretation { raw_response, .. } => Some(raw_response),
        }
    }
}
