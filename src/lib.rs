//! # edgequake-essay2txt
//!
//! Extract the text of handwritten ENEM-style essays from PDFs and phone
//! photos, then optionally score and rewrite them with an LLM.
//!
//! ## Why this crate?
//!
//! Students submit essays as scanned PDFs, typed PDFs or photos of ruled
//! notebook paper. Traditional OCR mostly fails on cursive and trips over
//! the ruling; vision LLMs read handwriting well but occasionally return
//! nothing. This crate cleans the page image, asks a vision model first and
//! falls back to Tesseract when the answer is too short to be an essay.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document (pdf / jpeg / png)
//!  │
//!  ├─ 1. Classify   PDF with text → done; scanned PDF → render page 1
//!  ├─ 2. Normalize  crop, deskew, equalise, binarise, strip ruling, thicken
//!  ├─ 3. Transcribe vision LLM; > 50 chars wins, else Tesseract
//!  └─ 4. Clean      drop vowel-less tokens and symbol-only lines
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_essay2txt::{extract_from_path, validate_essay_text, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / GEMINI_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let output = extract_from_path("redacao.jpg", None, &config).await?;
//!     validate_essay_text(&output.text, config.min_essay_chars)?;
//!     println!("{}", output.text);
//!     eprintln!("route: {} in {}ms", output.route, output.duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `essay2txt` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `tesseract` | off     | Links Tesseract/Leptonica via `leptess` for the fallback engine |
//!
//! Without `tesseract` the fallback engine is still wired in but always
//! answers with the empty string.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compare;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod review;
pub mod rewrite;
pub mod scoring;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compare::{compare_assessments, Comparison, ScoreDelta};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, NormalizationMode, NormalizeParams};
pub use document::{Document, MediaKind};
pub use engine::{TesseractEngine, TranscriptionEngine, VisionEngine};
pub use error::{EssayError, ReviewError};
pub use extract::{
    extract, extract_from_path, extract_sync, resolve_provider, validate_essay_text, Extractor,
};
pub use output::{ExtractionOutput, ExtractionRoute, Transcription};
pub use pipeline::classify::Classification;
pub use pipeline::normalize::{normalize_bytes, Normalization, NormalizedImage};
pub use pipeline::orchestrate::{passes_quality_gate, FallbackOrchestrator};
pub use pipeline::postprocess::clean_ocr_text;
pub use pipeline::render::{PdfReader, PdfiumReader};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use review::{AssessmentOutcome, EssayReviewer, ReviewReport};
pub use rewrite::GrammarRewriter;
pub use scoring::{parse_assessment, Assessment, CompetencyScore, EssayScorer, LlmCompleter, TextCompleter};
