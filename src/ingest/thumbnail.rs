//! Cover thumbnails derived from an uploaded document.
//!
//! PDFs render their first page through pdfium. EPUBs use the cover image
//! declared in the package and fall back to the first page's image. All of
//! this is best-effort: callers get `false` and a log line on failure.

use super::epub::{EpubArchive, EpubError};
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Scale applied to the first page when rendering.
const RENDER_SCALE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("pdfium: {0}")]
    Pdfium(String),
    #[error("epub: {0}")]
    Epub(#[from] EpubError),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no cover image found")]
    NoCover,
    #[error("unsupported format `{0}`")]
    Unsupported(String),
}

/// Generates cover thumbnails. Cheap to clone; pdfium is bound per call.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailExtractor {
    pdfium_dir: Option<PathBuf>,
}

impl ThumbnailExtractor {
    pub fn new(pdfium_dir: Option<PathBuf>) -> Self {
        Self { pdfium_dir }
    }

    /// Write a cover for `document` (of format `extension`) to `output`.
    ///
    /// Returns whether a cover was produced. Never fails the caller.
    ///
    /// The work runs on the blocking pool and is not cancelled with the
    /// caller: if the awaiting future is dropped mid-render, `output` may
    /// still appear after the caller's rollback has run.
    pub async fn generate(&self, document: &Path, output: &Path, extension: &str) -> bool {
        let this = self.clone();
        let document = document.to_path_buf();
        let output = output.to_path_buf();
        let extension = extension.to_string();

        let task = tokio::task::spawn_blocking(move || {
            let result = this.generate_blocking(&document, &output, &extension);
            (document, result)
        })
        .await;

        match task {
            Ok((document, Ok(()))) => {
                info!("generated thumbnail for {}", document.display());
                true
            }
            Ok((document, Err(err))) => {
                warn!("thumbnail extraction failed for {}: {}", document.display(), err);
                false
            }
            Err(err) => {
                warn!("thumbnail task failed: {}", err);
                false
            }
        }
    }

    fn generate_blocking(
        &self,
        document: &Path,
        output: &Path,
        extension: &str,
    ) -> Result<(), ThumbnailError> {
        match extension {
            "pdf" => self.render_first_page(document, output),
            "epub" => self.epub_cover(document, output),
            other => Err(ThumbnailError::Unsupported(other.to_string())),
        }
    }

    fn epub_cover(&self, document: &Path, output: &Path) -> Result<(), ThumbnailError> {
        let mut epub = EpubArchive::open(document)?;

        match epub.cover_image() {
            Ok(Some(bytes)) => {
                std::fs::write(output, bytes)?;
                return Ok(());
            }
            Ok(None) => debug!("{} declares no cover, using first page", document.display()),
            Err(err) => debug!(
                "declared cover of {} unreadable ({}), using first page",
                document.display(),
                err
            ),
        }

        match epub.first_page_image()? {
            Some(bytes) => {
                std::fs::write(output, bytes)?;
                Ok(())
            }
            None => Err(ThumbnailError::NoCover),
        }
    }

    fn render_first_page(&self, document: &Path, output: &Path) -> Result<(), ThumbnailError> {
        let pdfium = Pdfium::new(self.bind()?);
        let pdf = pdfium
            .load_pdf_from_file(document, None)
            .map_err(|e| ThumbnailError::Pdfium(e.to_string()))?;
        let page = pdf
            .pages()
            .get(0)
            .map_err(|e| ThumbnailError::Pdfium(e.to_string()))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ThumbnailError::Pdfium(e.to_string()))?;

        let image = DynamicImage::ImageRgb8(bitmap.as_image().into_rgb8());
        image.save_with_format(output, ImageFormat::Jpeg)?;
        Ok(())
    }

    fn bind(&self) -> Result<Box<dyn PdfiumLibraryBindings>, ThumbnailError> {
        if let Some(dir) = &self.pdfium_dir {
            match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)) {
                Ok(bindings) => return Ok(bindings),
                Err(err) => debug!("pdfium not usable from {}: {}", dir.display(), err),
            }
        }
        Pdfium::bind_to_system_library().map_err(|e| ThumbnailError::Pdfium(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn corrupt_pdf_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("broken.pdf");
        std::fs::write(&doc, b"%PDF-1.4 not really a pdf").unwrap();
        let out = dir.path().join("cover.jpg");

        let produced = ThumbnailExtractor::default().generate(&doc, &out, "pdf").await;
        assert!(!produced);
    }

    #[tokio::test]
    async fn unsupported_format_reports_false() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("a.txt");
        std::fs::write(&doc, b"text").unwrap();
        let out = dir.path().join("cover.jpg");

        assert!(!ThumbnailExtractor::default().generate(&doc, &out, "txt").await);
        assert!(!out.exists());
    }
}
