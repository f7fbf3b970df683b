//! Transcription engines: image in, text out.
//!
//! Two implementations sit behind one capability trait:
//!
//! * [`VisionEngine`] asks a multimodal LLM to read the page. It copes with
//!   handwriting far better but depends on a remote service.
//! * [`TesseractEngine`] runs local Tesseract OCR. Weaker on cursive, but it
//!   has no network dependency, so it serves as the fallback.
//!
//! Engines never fail: any error (network, decode, missing library) is
//! logged and collapses to the empty string. Deciding whether an empty or
//! short transcription is acceptable is the orchestrator's job.

mod tesseract;
mod vision;

pub use tesseract::TesseractEngine;
pub use vision::VisionEngine;

use crate::pipeline::normalize::NormalizedImage;
use async_trait::async_trait;

/// Anything that can turn a page image into text.
///
/// Implementations must be safe to call concurrently for different documents.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Short identifier used in logs and in [`crate::ExtractionOutput::engine`].
    fn name(&self) -> &str;

    /// Transcribe `image`, returning `""` on any failure.
    async fn transcribe(&self, image: &NormalizedImage) -> String;
}
