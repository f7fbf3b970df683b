//! PDF access via pdfium: per-page text extraction and first-page rasterisation.
//!
//! The classifier only talks to the [`PdfReader`] trait, so tests can swap in
//! a stub and the pipeline never needs a real libpdfium to be exercised.
//!
//! pdfium is CPU-bound and not async-safe; callers run these methods inside
//! `tokio::task::spawn_blocking`.

use crate::error::EssayError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read access to a PDF held in memory.
pub trait PdfReader: Send + Sync {
    /// Extractable text of every page, in page order.
    ///
    /// A page whose text layer cannot be read contributes an empty string.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, EssayError>;

    /// Render page one at `dpi`, capping either edge at `max_pixels`.
    fn render_first_page(
        &self,
        pdf: &[u8],
        dpi: u32,
        max_pixels: u32,
    ) -> Result<DynamicImage, EssayError>;
}

/// [`PdfReader`] backed by a dynamically loaded libpdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumReader {
    library_path: Option<PathBuf>,
}

impl PdfiumReader {
    /// `library_path` may name the library file or the directory holding it.
    /// When `None`, `PDFIUM_LIB_PATH` is consulted, then the system loader.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self) -> Result<Pdfium, EssayError> {
        let configured = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match configured {
            Some(path) => {
                let lib = library_file_for(&path);
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(lib)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| EssayError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

/// Resolve a directory to the platform library name inside it.
fn library_file_for(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

fn open_error(e: PdfiumError) -> EssayError {
    EssayError::CorruptPdf {
        detail: format!("{:?}", e),
    }
}

impl PdfReader for PdfiumReader {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, EssayError> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(open_error)?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => texts.push(text.all()),
                Err(e) => {
                    warn!("Page {}: text layer unreadable: {:?}", idx + 1, e);
                    texts.push(String::new());
                }
            }
        }
        Ok(texts)
    }

    fn render_first_page(
        &self,
        pdf: &[u8],
        dpi: u32,
        max_pixels: u32,
    ) -> Result<DynamicImage, EssayError> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(open_error)?;

        let pages = document.pages();
        if pages.len() == 0 {
            return Err(EssayError::CorruptPdf {
                detail: "document has no pages".into(),
            });
        }
        let page = pages.get(0).map_err(|e| EssayError::RasterisationFailed {
            detail: format!("{:?}", e),
        })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| EssayError::RasterisationFailed {
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page 1 at {} DPI → {}x{} px",
            dpi,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_library_file_is_used_as_is() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(library_file_for(file.path()), file.path());
    }

    #[test]
    fn directory_resolves_to_platform_library_name() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library_file_for(dir.path());
        assert_eq!(lib.parent(), Some(dir.path()));
        let name = lib.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.contains("pdfium"), "got {name}");
    }
}
