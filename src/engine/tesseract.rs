//! Local Tesseract OCR, the fallback engine.
//!
//! Built against `leptess` when the `tesseract` feature is enabled. Without
//! it the engine still exists so the pipeline shape does not change, but
//! every call logs a warning and yields `""`.

use super::TranscriptionEngine;
use crate::pipeline::normalize::NormalizedImage;
use async_trait::async_trait;
use std::path::PathBuf;
#[cfg(not(feature = "tesseract"))]
use tracing::warn;

/// Tesseract engine configured for a single uniform block of text (PSM 6)
/// with the LSTM recogniser (OEM 1).
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    language: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractEngine {
    pub fn new(language: impl Into<String>, tessdata_dir: Option<PathBuf>) -> Self {
        Self {
            language: language.into(),
            tessdata_dir,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn tessdata_dir(&self) -> Option<&std::path::Path> {
        self.tessdata_dir.as_deref()
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("por", None)
    }
}

#[async_trait]
impl TranscriptionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[cfg(feature = "tesseract")]
    async fn transcribe(&self, image: &NormalizedImage) -> String {
        let bytes = image.bytes().to_vec();
        let language = self.language.clone();
        let tessdata = self.tessdata_dir.clone();

        match tokio::task::spawn_blocking(move || ocr::run(&bytes, &language, tessdata.as_deref()))
            .await
        {
            Ok(Ok(text)) => text.trim().to_string(),
            Ok(Err(e)) => {
                tracing::warn!("Tesseract failed: {}", e);
                String::new()
            }
            Err(e) => {
                tracing::warn!("Tesseract task panicked: {}", e);
                String::new()
            }
        }
    }

    #[cfg(not(feature = "tesseract"))]
    async fn transcribe(&self, _image: &NormalizedImage) -> String {
        warn!(
            tessdata = ?self.tessdata_dir,
            "Tesseract fallback requested ({}) but the crate was built without the `tesseract` feature",
            self.language
        );
        String::new()
    }
}

#[cfg(feature = "tesseract")]
mod ocr {
    use leptess::{LepTess, Variable};
    use std::path::Path;

    /// Tesseract works best at 300 DPI; set after the image is loaded.
    const SOURCE_DPI: i32 = 300;

    /// LSTM only.
    pub(super) const OCR_ENGINE_MODE: &str = "1";
    pub(super) const PAGE_SEG_MODE: &str = "6";

    pub(super) fn run(
        image: &[u8],
        language: &str,
        tessdata: Option<&Path>,
    ) -> Result<String, String> {
        let datapath = tessdata.map(|p| p.to_string_lossy().into_owned());
        let mut tess = LepTess::new(datapath.as_deref(), language)
            .map_err(|e| format!("init ({language}): {e:?}"))?;

        // Init-only in some Tesseract builds, which then keep their default
        // engine (LSTM whenever the traineddata ships it).
        if let Err(e) = tess.set_variable(Variable::TesseditOcrEngineMode, OCR_ENGINE_MODE) {
            tracing::debug!("OCR engine mode not applied: {e:?}");
        }
        tess.set_variable(Variable::TesseditPagesegMode, PAGE_SEG_MODE)
            .map_err(|e| format!("page segmentation mode: {e:?}"))?;
        tess.set_variable(Variable::PreserveInterwordSpaces, "1")
            .map_err(|e| format!("preserve_interword_spaces: {e:?}"))?;

        tess.set_image_from_mem(image)
            .map_err(|e| format!("load image: {e:?}"))?;
        tess.set_source_resolution(SOURCE_DPI);

        tess.get_utf8_text().map_err(|e| format!("recognise: {e:?}"))
    }
}
