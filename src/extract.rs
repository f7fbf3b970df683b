//! Extraction entry points.
//!
//! [`Extractor`] wires the stages together for one document:
//!
//! ```text
//! classify ──▶ (image) normalize ──▶ FallbackOrchestrator ──┐
//!    │                                                      ├──▶ clean_ocr_text
//!    └──▶ (pdf with text) ──────────────────────────────────┘
//! ```
//!
//! Only setup problems are errors. A document that yields no text comes
//! back as `Ok` with an empty [`ExtractionOutput::text`]; use
//! [`validate_essay_text`] to turn that into a user-facing rejection.

use crate::config::ExtractionConfig;
use crate::document::Document;
use crate::engine::{TesseractEngine, TranscriptionEngine, VisionEngine};
use crate::error::EssayError;
use crate::output::{ExtractionOutput, ExtractionRoute};
use crate::pipeline::classify::{classify, Classification};
use crate::pipeline::input;
use crate::pipeline::normalize::normalize_bytes;
use crate::pipeline::orchestrate::FallbackOrchestrator;
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::render::{PdfReader, PdfiumReader};
use crate::progress::Stage;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Default model when a provider is named without one.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// A reusable extraction pipeline.
///
/// Cheap to clone; every capability is behind an `Arc` and no state is kept
/// between documents, so one instance may serve concurrent requests.
#[derive(Clone)]
pub struct Extractor {
    pdf_reader: Arc<dyn PdfReader>,
    orchestrator: FallbackOrchestrator,
    config: ExtractionConfig,
}

impl Extractor {
    /// Build from explicit capability handles.
    pub fn new(
        pdf_reader: Arc<dyn PdfReader>,
        primary: Arc<dyn TranscriptionEngine>,
        secondary: Arc<dyn TranscriptionEngine>,
        config: ExtractionConfig,
    ) -> Self {
        let orchestrator = FallbackOrchestrator::new(primary, secondary)
            .with_quality_threshold(config.quality_threshold);
        Self {
            pdf_reader,
            orchestrator,
            config,
        }
    }

    /// Build the production pipeline: pdfium, the resolved vision provider
    /// and Tesseract.
    pub async fn from_config(config: &ExtractionConfig) -> Result<Self, EssayError> {
        let provider = resolve_provider(config).await?;
        debug!(
            "Vision engine ready (model: {})",
            config.model.as_deref().unwrap_or("provider default")
        );
        let primary = Arc::new(VisionEngine::with_config(provider, config));
        let secondary = Arc::new(TesseractEngine::new(
            config.tesseract_language.clone(),
            config.tessdata_dir.clone(),
        ));
        let reader = Arc::new(PdfiumReader::new(config.pdfium_library_path.clone()));
        Ok(Self::new(reader, primary, secondary, config.clone()))
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn nothing(&self, route: ExtractionRoute, start: Instant) -> ExtractionOutput {
        info!("No text extracted: {}", route);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_extraction_complete(route, 0);
        }
        ExtractionOutput::empty(route, start.elapsed().as_millis() as u64)
    }

    /// Extract the essay text of one document.
    pub async fn extract(&self, document: &Document) -> Result<ExtractionOutput, EssayError> {
        let start = Instant::now();
        let progress = self.config.progress_callback.as_ref();
        let notify = |stage: Stage| {
            if let Some(cb) = progress {
                cb.on_stage(stage);
            }
        };

        info!("Extracting {:?}", document);
        if let Some(cb) = progress {
            cb.on_extraction_start(document.kind());
        }

        // ── Step 1: Classify ─────────────────────────────────────────────
        notify(Stage::Classify);
        let classification = classify(document, &self.pdf_reader, &self.config).await?;

        let (raw_text, route, engine, normalized) = match classification {
            Classification::Unsupported => {
                return Ok(self.nothing(ExtractionRoute::Unsupported, start));
            }
            Classification::Unreadable => {
                return Ok(self.nothing(ExtractionRoute::Unreadable, start));
            }
            Classification::NativeText(text) => (text, ExtractionRoute::NativeText, None, false),
            Classification::Image { bytes, kind } => {
                // ── Step 2: Normalize ────────────────────────────────────
                notify(Stage::Normalize);
                let params = self.config.normalize_params();
                let norm_start = Instant::now();
                let normalization =
                    tokio::task::spawn_blocking(move || normalize_bytes(&bytes, &params))
                        .await
                        .map_err(|e| {
                            EssayError::Internal(format!("Normalisation task panicked: {}", e))
                        })?;
                debug!(
                    "Normalisation ({:?}) took {}ms",
                    params.mode,
                    norm_start.elapsed().as_millis()
                );
                let image = normalization.into_image(kind);

                // ── Step 3: Transcribe with fallback ─────────────────────
                let (transcription, route) = self.orchestrator.transcribe(&image, progress).await;
                (
                    transcription.text,
                    route,
                    Some(transcription.engine),
                    image.processed(),
                )
            }
        };

        // ── Step 4: Noise filter ─────────────────────────────────────────
        notify(Stage::Clean);
        let text = clean_ocr_text(&raw_text);
        let chars = text.chars().count();

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extraction complete: route={}, {} chars ({} raw), {}ms",
            route,
            chars,
            raw_text.chars().count(),
            duration_ms
        );
        if let Some(cb) = progress {
            cb.on_extraction_complete(route, chars);
        }

        Ok(ExtractionOutput {
            text,
            raw_text,
            route,
            engine,
            normalized,
            duration_ms,
        })
    }
}

/// Extract the essay text of `document` with the production pipeline.
///
/// # Example
/// ```rust,no_run
/// use edgequake_essay2txt::{extract, Document, ExtractionConfig, MediaKind};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("redacao.jpg")?;
/// let doc = Document::new(bytes, MediaKind::Jpeg);
/// let output = extract(&doc, &ExtractionConfig::default()).await?;
/// println!("{}", output.text);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    document: &Document,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, EssayError> {
    Extractor::from_config(config).await?.extract(document).await
}

/// Resolve a local path or URL, then [`extract`] it.
pub async fn extract_from_path(
    input_str: impl AsRef<str>,
    content_type: Option<&str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, EssayError> {
    let document =
        input::resolve_input(input_str.as_ref(), content_type, config.download_timeout_secs)
            .await?;
    extract(&document, config).await
}

/// Synchronous wrapper around [`extract_from_path`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    content_type: Option<&str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, EssayError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| EssayError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_from_path(input_str, content_type, config))
}

/// Reject text with fewer than `min_chars` non-whitespace characters.
pub fn validate_essay_text(text: &str, min_chars: usize) -> Result<(), EssayError> {
    let found = text.chars().filter(|c| !c.is_whitespace()).count();
    if found < min_chars {
        return Err(EssayError::InsufficientText {
            found,
            required: min_chars,
        });
    }
    Ok(())
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, EssayError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        EssayError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    when both are non-empty.
/// 4. **`OPENAI_API_KEY`** present: OpenAI with the configured or default model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub async fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, EssayError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| EssayError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, GEMINI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
