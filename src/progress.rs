//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as a document moves through the fallback chain.
//!
//! # Example
//!
//! ```rust
//! use edgequake_essay2txt::{ExtractionConfig, ExtractionProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StageLog {
//!     stages: Mutex<Vec<Stage>>,
//! }
//!
//! impl ExtractionProgressCallback for StageLog {
//!     fn on_stage(&self, stage: Stage) {
//!         self.stages.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog::default());
//! let config = ExtractionConfig::builder()
//!     .progress_callback(log as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::document::MediaKind;
use crate::output::ExtractionRoute;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// States of the extraction state machine, in the order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Classify,
    Rasterise,
    Normalize,
    PrimaryOcr,
    QualityGate,
    SecondaryOcr,
    Clean,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Classify => "classifying document",
            Stage::Rasterise => "rasterising first page",
            Stage::Normalize => "normalising image",
            Stage::PrimaryOcr => "AI transcription",
            Stage::QualityGate => "checking transcription quality",
            Stage::SecondaryOcr => "Tesseract fallback",
            Stage::Clean => "filtering OCR noise",
        };
        f.write_str(label)
    }
}

/// Called by the pipeline as it processes one document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// same callback may be shared by concurrent extractions.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before classification.
    fn on_extraction_start(&self, kind: MediaKind) {
        let _ = kind;
    }

    /// Called when the pipeline enters a stage.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after a transcription engine returns.
    ///
    /// `chars` is the character count of the trimmed transcription (0 when
    /// the engine failed).
    fn on_engine_complete(&self, engine: &str, chars: usize) {
        let _ = (engine, chars);
    }

    /// Called once with the route taken and the length of the cleaned text.
    fn on_extraction_complete(&self, route: ExtractionRoute, chars: usize) {
        let _ = (route, chars);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
