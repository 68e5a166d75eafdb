//! Text and embedded-image extraction from nest report PDFs.
//!
//! The rest of the pipeline only sees the [`NestDocument`] trait, so tests
//! drive it with in-memory documents and never need the pdfium library.
//! [`PdfiumLoader`] is the production implementation; its calls are
//! blocking and run inside the batch's `spawn_blocking` task.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::error::{NestQuoteError, NestQuoteResult};

/// Environment variable naming a directory (or file) holding libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// An image embedded in a page, in document order.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// 0-based page index.
    pub page: usize,
    pub image: DynamicImage,
}

impl EmbeddedImage {
    pub fn new(page: usize, image: DynamicImage) -> Self {
        Self { page, image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// An opened nest report.
pub trait NestDocument {
    /// Text of each page, in page order.
    fn page_texts(&self) -> NestQuoteResult<Vec<String>>;

    /// Every embedded image, page by page, in the order the page lists them.
    fn images(&self) -> NestQuoteResult<Vec<EmbeddedImage>>;
}

/// Opens nest reports by path.
pub trait NestLoader {
    fn load<'a>(&'a self, path: &Path) -> NestQuoteResult<Box<dyn NestDocument + 'a>>;
}

/// Join page texts one per line, turn CR and CRLF breaks into `\n`, then
/// fold `" \n"` into a space so labels wrapped onto the next line still
/// match their patterns.
pub fn normalise_text(pages: &[String]) -> String {
    pages
        .join("\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(" \n", " ")
}

/// Read the whole report into one normalised text blob.
pub fn extract_text(document: &dyn NestDocument) -> NestQuoteResult<String> {
    Ok(normalise_text(&document.page_texts()?))
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Loads nest reports through a bound pdfium library.
pub struct PdfiumLoader {
    pdfium: Pdfium,
}

impl PdfiumLoader {
    /// Bind pdfium from `PDFIUM_LIB_PATH` when set, else from `./lib`, else
    /// from the system library path.
    pub fn bind() -> NestQuoteResult<Self> {
        let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
            Some(dir) => {
                let dir = PathBuf::from(dir);
                let path = if dir.is_file() {
                    dir
                } else {
                    Pdfium::pdfium_platform_library_name_at_path(&dir)
                };
                debug!("Binding pdfium from {}", path.display());
                Pdfium::bind_to_library(&path)
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./lib"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| NestQuoteError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl NestLoader for PdfiumLoader {
    fn load<'a>(&'a self, path: &Path) -> NestQuoteResult<Box<dyn NestDocument + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| NestQuoteError::CorruptPdf {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;
        info!("Opened {} ({} pages)", path.display(), document.pages().len());
        Ok(Box::new(PdfiumDocument {
            path: path.to_path_buf(),
            document,
        }))
    }
}

/// A nest report opened with pdfium.
pub struct PdfiumDocument<'a> {
    path: PathBuf,
    document: PdfDocument<'a>,
}

impl PdfiumDocument<'_> {
    fn extraction_error(&self, page: usize, e: PdfiumError) -> NestQuoteError {
        NestQuoteError::ExtractionFailed {
            path: self.path.clone(),
            page: page + 1,
            detail: format!("{e:?}"),
        }
    }
}

impl NestDocument for PdfiumDocument<'_> {
    fn page_texts(&self) -> NestQuoteResult<Vec<String>> {
        let mut texts = Vec::new();
        for (index, page) in self.document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| self.extraction_error(index, e))?;
            texts.push(text.all());
        }
        Ok(texts)
    }

    fn images(&self) -> NestQuoteResult<Vec<EmbeddedImage>> {
        let mut images = Vec::new();
        for (index, page) in self.document.pages().iter().enumerate() {
            for object in page.objects().iter() {
                let Some(image_object) = object.as_image_object() else {
                    continue;
                };
                let image = image_object
                    .get_raw_image()
                    .map_err(|e| self.extraction_error(index, e))?;
                images.push(EmbeddedImage::new(index, image));
            }
        }
        debug!("{}: {} embedded images", self.path.display(), images.len());
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_labels_are_joined() {
        let pages = vec![
            "WEIGHT: \n1.50 lb\n".to_string(),
            "PART NUMBER: 2\n".to_string(),
        ];
        assert_eq!(normalise_text(&pages), "WEIGHT: 1.50 lb\n\nPART NUMBER: 2\n");
    }

    #[test]
    fn crlf_breaks_are_folded_like_newlines() {
        use crate::pipeline::fields::{Field, FieldMatcher};

        let pages = vec!["WEIGHT: \r\n1.50 lb\r\nSURFACE: 4.00  in2".to_string()];
        let text = normalise_text(&pages);
        assert!(!text.contains('\r'));
        assert_eq!(text, "WEIGHT: 1.50 lb\nSURFACE: 4.00  in2");

        let matcher = FieldMatcher::builtin().unwrap();
        assert_eq!(matcher.match_all(Field::Weight, &text).unwrap(), vec!["1.50"]);
    }

    #[test]
    fn pages_do_not_run_together() {
        let pages = vec!["SHEET COUNT: 3".to_string(), "MATERIAL: ST".to_string()];
        assert_eq!(normalise_text(&pages), "SHEET COUNT: 3\nMATERIAL: ST");
    }

    #[test]
    fn embedded_image_dimensions() {
        let image = EmbeddedImage::new(0, DynamicImage::new_rgb8(580, 440));
        assert_eq!(image.dimensions(), (580, 440));
    }
}
