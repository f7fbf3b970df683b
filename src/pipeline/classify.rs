//! Format classification: decide whether a document needs imaging at all.
//!
//! ```text
//! Document ──▶ pdf? ──▶ any page with text? ──yes──▶ NativeText(all pages)
//!    │                        │no
//!    │                        └──▶ rasterise page 1 @ dpi ──▶ Image(png)
//!    ├──▶ jpeg/png ───────────────────────────────────────▶ Image(bytes)
//!    └──▶ unknown / empty ────────────────────────────────▶ Unsupported
//! ```
//!
//! One text-bearing page is enough to treat the *whole* document as native
//! text. A mixed document with scanned pages therefore loses those pages,
//! and only page one of a fully scanned PDF is ever transcribed.

use crate::config::ExtractionConfig;
use crate::document::{Document, MediaKind};
use crate::error::EssayError;
use crate::pipeline::encode::encode_png;
use crate::pipeline::render::PdfReader;
use crate::progress::Stage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extraction path chosen for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Unknown media kind or empty payload.
    Unsupported,
    /// A PDF pdfium could not open or render.
    Unreadable,
    /// Page texts joined with `\n`, trimmed.
    NativeText(String),
    /// Encoded page image that must be normalised and transcribed.
    Image { bytes: Vec<u8>, kind: MediaKind },
}

/// Join page texts in order, or `None` when no page has non-whitespace text.
pub fn native_text(pages: &[String]) -> Option<String> {
    if pages.iter().all(|p| p.trim().is_empty()) {
        return None;
    }
    Some(pages.join("\n").trim().to_string())
}

/// Classify a document, extracting native text or producing a page image.
///
/// Only pdfium binding failures and panicked blocking tasks are returned as
/// errors; a corrupt PDF is [`Classification::Unreadable`].
pub async fn classify(
    document: &Document,
    reader: &Arc<dyn PdfReader>,
    config: &ExtractionConfig,
) -> Result<Classification, EssayError> {
    if document.is_empty() {
        debug!("Empty payload, nothing to classify");
        return Ok(Classification::Unsupported);
    }

    match document.kind() {
        MediaKind::Unknown => Ok(Classification::Unsupported),
        MediaKind::Jpeg | MediaKind::Png => Ok(Classification::Image {
            bytes: document.bytes().to_vec(),
            kind: document.kind(),
        }),
        MediaKind::Pdf => classify_pdf(document.bytes(), reader, config).await,
    }
}

async fn classify_pdf(
    pdf: &[u8],
    reader: &Arc<dyn PdfReader>,
    config: &ExtractionConfig,
) -> Result<Classification, EssayError> {
    let texts = {
        let reader = Arc::clone(reader);
        let bytes = pdf.to_vec();
        tokio::task::spawn_blocking(move || reader.page_texts(&bytes))
            .await
            .map_err(|e| EssayError::Internal(format!("Text extraction task panicked: {}", e)))?
    };

    let texts = match texts {
        Ok(texts) => texts,
        Err(EssayError::CorruptPdf { detail }) => {
            warn!("PDF unreadable: {}", detail);
            return Ok(Classification::Unreadable);
        }
        Err(e) => return Err(e),
    };

    if let Some(text) = native_text(&texts) {
        info!(
            "Native-text PDF: {} pages, {} chars, skipping OCR",
            texts.len(),
            text.chars().count()
        );
        return Ok(Classification::NativeText(text));
    }

    info!("No embedded text in {} pages, rasterising page 1", texts.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(Stage::Rasterise);
    }

    let rendered = {
        let reader = Arc::clone(reader);
        let bytes = pdf.to_vec();
        let (dpi, max_pixels) = (config.dpi, config.max_rendered_pixels);
        tokio::task::spawn_blocking(move || reader.render_first_page(&bytes, dpi, max_pixels))
            .await
            .map_err(|e| EssayError::Internal(format!("Render task panicked: {}", e)))?
    };

    let image = match rendered {
        Ok(image) => image,
        Err(e @ (EssayError::CorruptPdf { .. } | EssayError::RasterisationFailed { .. })) => {
            warn!("{}", e);
            return Ok(Classification::Unreadable);
        }
        Err(e) => return Err(e),
    };

    match encode_png(&image) {
        Ok(bytes) => Ok(Classification::Image {
            bytes,
            kind: MediaKind::Png,
        }),
        Err(e) => {
            warn!("Rendered page could not be encoded: {}", e);
            Ok(Classification::Unreadable)
        }
    }
}
