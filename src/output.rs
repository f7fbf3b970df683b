//! Result types produced by an extraction run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which branch of the state machine produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionRoute {
    /// Unknown media kind or empty payload; nothing ran.
    Unsupported,
    /// A PDF that pdfium could not open.
    Unreadable,
    /// Embedded PDF text, no imaging or transcription.
    NativeText,
    /// The AI transcription passed the quality gate.
    Primary,
    /// The AI transcription was too short; traditional OCR answered.
    Fallback,
}

impl fmt::Display for ExtractionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExtractionRoute::Unsupported => "unsupported",
            ExtractionRoute::Unreadable => "unreadable",
            ExtractionRoute::NativeText => "native-text",
            ExtractionRoute::Primary => "primary",
            ExtractionRoute::Fallback => "fallback",
        };
        f.write_str(label)
    }
}

/// Text produced by one transcription engine.
///
/// The empty string is the canonical "no result" value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub engine: String,
}

impl Transcription {
    pub fn new(text: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            engine: engine.into(),
        }
    }

    /// Length signal used by the quality gate: characters of trimmed text.
    pub fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Complete output of [`crate::extract::Extractor::extract`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Noise-filtered text, paragraphs separated by one blank line.
    pub text: String,
    /// Text exactly as the classifier or the winning engine produced it.
    pub raw_text: String,
    pub route: ExtractionRoute,
    /// Engine that produced `raw_text`, when one ran.
    pub engine: Option<String>,
    /// Whether the normaliser actually rewrote the image.
    pub normalized: bool,
    pub duration_ms: u64,
}

impl ExtractionOutput {
    pub(crate) fn empty(route: ExtractionRoute, duration_ms: u64) -> Self {
        Self {
            text: String::new(),
            raw_text: String::new(),
            route,
            engine: None,
            normalized: false,
            duration_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
