//! Fallback orchestration between the AI and traditional OCR engines.
//!
//! ```text
//! image ──▶ primary ──▶ trimmed len > threshold? ──yes──▶ (text, Primary)
//!                               │no
//!                               └──▶ secondary ──────────▶ (text, Fallback)
//! ```
//!
//! Each engine is called at most once per document and nothing is retried.
//! The secondary's answer is returned as-is, even when it is shorter than
//! the primary's or empty; judging an empty result is the caller's job.

use crate::engine::TranscriptionEngine;
use crate::output::{ExtractionRoute, Transcription};
use crate::pipeline::normalize::NormalizedImage;
use crate::progress::{ProgressCallback, Stage};
use std::sync::Arc;
use tracing::{debug, info};

/// Default quality-gate length, in characters of trimmed text.
pub const DEFAULT_QUALITY_THRESHOLD: usize = 50;

/// `true` when the trimmed `text` is strictly longer than `threshold` chars.
pub fn passes_quality_gate(text: &str, threshold: usize) -> bool {
    text.trim().chars().count() > threshold
}

/// Runs the primary engine and falls back to the secondary when its output
/// is too short.
#[derive(Clone)]
pub struct FallbackOrchestrator {
    primary: Arc<dyn TranscriptionEngine>,
    secondary: Arc<dyn TranscriptionEngine>,
    quality_threshold: usize,
}

impl FallbackOrchestrator {
    pub fn new(
        primary: Arc<dyn TranscriptionEngine>,
        secondary: Arc<dyn TranscriptionEngine>,
    ) -> Self {
        Self {
            primary,
            secondary,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }

    pub fn with_quality_threshold(mut self, chars: usize) -> Self {
        self.quality_threshold = chars;
        self
    }

    pub fn quality_threshold(&self) -> usize {
        self.quality_threshold
    }

    /// Transcribe `image`, returning the accepted text and the branch taken.
    pub async fn transcribe(
        &self,
        image: &NormalizedImage,
        progress: Option<&ProgressCallback>,
    ) -> (Transcription, ExtractionRoute) {
        let notify = |stage: Stage| {
            if let Some(cb) = progress {
                cb.on_stage(stage);
            }
        };

        notify(Stage::PrimaryOcr);
        let primary = Transcription::new(self.primary.transcribe(image).await, self.primary.name());
        let primary_len = primary.trimmed_len();
        if let Some(cb) = progress {
            cb.on_engine_complete(&primary.engine, primary_len);
        }

        notify(Stage::QualityGate);
        if passes_quality_gate(&primary.text, self.quality_threshold) {
            info!(
                "{} transcription accepted ({} chars > {})",
                primary.engine, primary_len, self.quality_threshold
            );
            return (primary, ExtractionRoute::Primary);
        }

        info!(
            "{} transcription too short ({} chars ≤ {}), falling back to {}",
            primary.engine,
            primary_len,
            self.quality_threshold,
            self.secondary.name()
        );

        notify(Stage::SecondaryOcr);
        let secondary =
            Transcription::new(self.secondary.transcribe(image).await, self.secondary.name());
        let secondary_len = secondary.trimmed_len();
        if let Some(cb) = progress {
            cb.on_engine_complete(&secondary.engine, secondary_len);
        }
        debug!("{} returned {} chars", secondary.engine, secondary_len);

        (secondary, ExtractionRoute::Fallback)
    }
}
