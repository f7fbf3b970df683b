//! Configuration types for essay text extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share a config across concurrent requests and to log exactly
//! which thresholds produced a given transcription.

use crate::error::EssayError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one or many extractions.
///
/// # Example
/// ```rust
/// use edgequake_essay2txt::{ExtractionConfig, NormalizationMode};
///
/// let config = ExtractionConfig::builder()
///     .normalization(NormalizationMode::Gentle)
///     .quality_threshold(80)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rasterisation DPI for scanned PDFs. Range: 72–600. Default: 300.
    ///
    /// Handwriting strokes are thin; below ~200 DPI the binarisation step
    /// breaks them into disconnected specks.
    pub dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 4000.
    ///
    /// An A4 page at 300 DPI is 2480 × 3508 px; the cap only bites on
    /// oversized pages.
    pub max_rendered_pixels: u32,

    /// Which normaliser variant to run on page images. Default: Aggressive.
    pub normalization: NormalizationMode,

    /// Fraction of the image height cropped from the top before deskew. Default: 0.25.
    ///
    /// Exam sheets carry a printed header and photos usually have a shadow
    /// band there; neither is essay text.
    pub top_crop_fraction: f32,

    /// Side of the adaptive-threshold window in pixels (odd). Default: 31.
    pub threshold_block_size: u32,

    /// Constant subtracted from the local mean before thresholding. Default: 8.
    pub threshold_offset: i32,

    /// Minimum length of a horizontal ink run treated as notebook ruling. Default: 50.
    pub line_kernel_width: u32,

    /// Quality-gate length in characters of trimmed AI output. Default: 50.
    ///
    /// The AI transcription is accepted only when it is strictly longer.
    pub quality_threshold: usize,

    /// Minimum non-whitespace characters for [`crate::validate_essay_text`]. Default: 20.
    pub min_essay_chars: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "gemini-2.0-flash".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens for one completion. Default: 4096.
    pub max_tokens: usize,

    /// Custom transcription instruction. If None, uses the built-in prompt.
    pub transcription_prompt: Option<String>,

    /// Tesseract language code. Default: "por".
    pub tesseract_language: String,

    /// Tesseract `tessdata` directory. If None, Tesseract's own default.
    pub tessdata_dir: Option<PathBuf>,

    /// Directory containing libpdfium. If None, `PDFIUM_LIB_PATH`, then the system loader.
    pub pdfium_library_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Stage events receiver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 4000,
            normalization: NormalizationMode::default(),
            top_crop_fraction: 0.25,
            threshold_block_size: 31,
            threshold_offset: 8,
            line_kernel_width: 50,
            quality_threshold: 50,
            min_essay_chars: 20,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            transcription_prompt: None,
            tesseract_language: "por".to_string(),
            tessdata_dir: None,
            pdfium_library_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("normalization", &self.normalization)
            .field("top_crop_fraction", &self.top_crop_fraction)
            .field("threshold_block_size", &self.threshold_block_size)
            .field("threshold_offset", &self.threshold_offset)
            .field("line_kernel_width", &self.line_kernel_width)
            .field("quality_threshold", &self.quality_threshold)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("tesseract_language", &self.tesseract_language)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The normaliser knobs, detached from provider state.
    pub fn normalize_params(&self) -> NormalizeParams {
        NormalizeParams {
            mode: self.normalization,
            top_crop_fraction: self.top_crop_fraction,
            threshold_block_size: self.threshold_block_size,
            threshold_offset: self.threshold_offset,
            line_kernel_width: self.line_kernel_width,
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn normalization(mut self, mode: NormalizationMode) -> Self {
        self.config.normalization = mode;
        self
    }

    pub fn top_crop_fraction(mut self, fraction: f32) -> Self {
        self.config.top_crop_fraction = fraction.clamp(0.0, 0.9);
        self
    }

    pub fn threshold_block_size(mut self, size: u32) -> Self {
        self.config.threshold_block_size = size;
        self
    }

    pub fn threshold_offset(mut self, offset: i32) -> Self {
        self.config.threshold_offset = offset;
        self
    }

    pub fn line_kernel_width(mut self, width: u32) -> Self {
        self.config.line_kernel_width = width;
        self
    }

    pub fn quality_threshold(mut self, chars: usize) -> Self {
        self.config.quality_threshold = chars;
        self
    }

    pub fn min_essay_chars(mut self, chars: usize) -> Self {
        self.config.min_essay_chars = chars;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn transcription_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.transcription_prompt = Some(prompt.into());
        self
    }

    pub fn tesseract_language(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_language = lang.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(dir.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, EssayError> {
        let c = &self.config;
        if c.threshold_block_size < 3 || c.threshold_block_size % 2 == 0 {
            return Err(EssayError::InvalidConfig(format!(
                "threshold block size must be odd and ≥ 3, got {}",
                c.threshold_block_size
            )));
        }
        if c.line_kernel_width < 2 {
            return Err(EssayError::InvalidConfig(format!(
                "line kernel width must be ≥ 2, got {}",
                c.line_kernel_width
            )));
        }
        if c.tesseract_language.trim().is_empty() {
            return Err(EssayError::InvalidConfig(
                "tesseract language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which normaliser entry point runs on page images.
///
/// | Mode | Steps | Use for |
/// |------|-------|---------|
/// | Aggressive | crop, gray, deskew, equalise, binarise, strip ruling, dilate | phone photos of ruled notebook paper |
/// | Gentle | gray, denoise, edge-based deskew | flatbed scans and clean photos |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizationMode {
    #[default]
    Aggressive,
    Gentle,
}

/// Parameters consumed by [`crate::pipeline::normalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeParams {
    pub mode: NormalizationMode,
    pub top_crop_fraction: f32,
    pub threshold_block_size: u32,
    pub threshold_offset: i32,
    pub line_kernel_width: u32,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        ExtractionConfig::default().normalize_params()
    }
}
