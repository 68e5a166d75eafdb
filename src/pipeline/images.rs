//! Image association: classify embedded images, write numbered files, and
//! later rename them after the nest or part they belong to.
//!
//! Part thumbnails are matched to parts purely by position, so images must
//! be processed in document order and the numbering must never skip or
//! reuse an index. [`ImageCounter`] carries the numbering across every file
//! of a batch.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::config::IngestConfig;
use crate::error::{NestQuoteError, NestQuoteResult};
use crate::pipeline::extract::EmbeddedImage;

/// What an embedded image is, judged by its exact pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Decorative icon, skipped.
    Icon,
    /// The nest overview picture.
    Nest,
    /// A part thumbnail.
    Part,
}

pub fn classify(dimensions: (u32, u32), config: &IngestConfig) -> ImageKind {
    if dimensions == config.icon_size {
        ImageKind::Icon
    } else if dimensions == config.nest_image_size {
        ImageKind::Nest
    } else {
        ImageKind::Part
    }
}

/// Monotonic part and nest picture numbering for one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageCounter {
    parts: usize,
    nests: usize,
}

impl ImageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_part(&mut self) -> usize {
        let index = self.parts;
        self.parts += 1;
        index
    }

    pub fn next_nest(&mut self) -> usize {
        let index = self.nests;
        self.nests += 1;
        index
    }

    pub fn parts_written(&self) -> usize {
        self.parts
    }

    pub fn nests_written(&self) -> usize {
        self.nests
    }
}

/// Numbered picture files written for one nest report, in document order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NumberedImages {
    /// The first nest overview picture, if the report had one.
    pub nest: Option<PathBuf>,
    pub parts: Vec<PathBuf>,
}

/// Classify and write every image of one report.
///
/// Nest pictures are saved as is, part thumbnails are resized to a
/// `size_of_picture` square with Lanczos filtering. Only the first nest
/// picture is kept; later ones still consume a number.
pub fn write_numbered_images(
    images: Vec<EmbeddedImage>,
    counter: &mut ImageCounter,
    config: &IngestConfig,
) -> NestQuoteResult<NumberedImages> {
    let mut numbered = NumberedImages::default();
    for embedded in images {
        match classify(embedded.dimensions(), config) {
            ImageKind::Icon => continue,
            ImageKind::Nest => {
                let path = config
                    .image_dir
                    .join(format!("nest-{}.jpeg", counter.next_nest()));
                write_jpeg(&embedded.image, &path)?;
                if numbered.nest.is_none() {
                    numbered.nest = Some(path);
                } else {
                    warn!("Extra nest picture on page {} written to {}", embedded.page + 1, path.display());
                }
            }
            ImageKind::Part => {
                let size = config.size_of_picture;
                let thumbnail = embedded.image.resize_exact(size, size, FilterType::Lanczos3);
                let path = config
                    .image_dir
                    .join(format!("part-{}.jpeg", counter.next_part()));
                write_jpeg(&thumbnail, &path)?;
                numbered.parts.push(path);
            }
        }
    }
    debug!(
        parts = numbered.parts.len(),
        nest = numbered.nest.is_some(),
        "wrote numbered images"
    );
    Ok(numbered)
}

fn write_jpeg(image: &DynamicImage, path: &Path) -> NestQuoteResult<()> {
    // the JPEG encoder rejects alpha channels
    DynamicImage::ImageRgb8(image.to_rgb8())
        .save_with_format(path, ImageFormat::Jpeg)
        .map_err(|e| NestQuoteError::ImageWriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Move a numbered picture to `<image_dir>/<name>.jpeg` and return the
/// reference stored on the record.
///
/// Returns `Ok(None)` when the numbered file is gone; the caller falls back
/// to the placeholder.
pub fn place_image(numbered: &Path, name: &str, config: &IngestConfig) -> NestQuoteResult<Option<String>> {
    if !numbered.is_file() {
        return Ok(None);
    }
    let target = config.image_dir.join(format!("{name}.jpeg"));
    std::fs::rename(numbered, &target).map_err(|e| NestQuoteError::ImageWriteFailed {
        path: target.clone(),
        reason: e.to_string(),
    })?;
    Ok(Some(target.to_string_lossy().replace('\\', "/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn config_in(dir: &Path) -> IngestConfig {
        IngestConfig::builder().image_dir(dir).build().unwrap()
    }

    fn image(w: u32, h: u32) -> EmbeddedImage {
        EmbeddedImage::new(0, DynamicImage::ImageRgba8(RgbaImage::new(w, h)))
    }

    #[test]
    fn classification_by_exact_size() {
        let config = IngestConfig::default();
        assert_eq!(classify((48, 48), &config), ImageKind::Icon);
        assert_eq!(classify((580, 440), &config), ImageKind::Nest);
        assert_eq!(classify((440, 580), &config), ImageKind::Part);
        assert_eq!(classify((320, 200), &config), ImageKind::Part);
    }

    #[test]
    fn counters_are_independent_and_monotonic() {
        let mut counter = ImageCounter::new();
        assert_eq!(counter.next_part(), 0);
        assert_eq!(counter.next_nest(), 0);
        assert_eq!(counter.next_part(), 1);
        assert_eq!(counter.parts_written(), 2);
        assert_eq!(counter.nests_written(), 1);
    }

    #[test]
    fn writes_thumbnails_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut counter = ImageCounter::new();

        let images = vec![image(48, 48), image(300, 120), image(580, 440), image(90, 90)];
        let numbered = write_numbered_images(images, &mut counter, &config).unwrap();

        assert_eq!(numbered.nest, Some(dir.path().join("nest-0.jpeg")));
        assert_eq!(
            numbered.parts,
            vec![dir.path().join("part-0.jpeg"), dir.path().join("part-1.jpeg")]
        );
        let thumb = image::open(&numbered.parts[0]).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (100, 100));
        let nest = image::open(numbered.nest.as_ref().unwrap()).unwrap();
        assert_eq!((nest.width(), nest.height()), (580, 440));
    }

    #[test]
    fn numbering_continues_across_reports() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut counter = ImageCounter::new();

        write_numbered_images(vec![image(10, 10)], &mut counter, &config).unwrap();
        let second = write_numbered_images(vec![image(10, 10)], &mut counter, &config).unwrap();
        assert_eq!(second.parts, vec![dir.path().join("part-1.jpeg")]);
    }

    #[test]
    fn place_image_renames_or_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut counter = ImageCounter::new();
        let numbered = write_numbered_images(vec![image(10, 10)], &mut counter, &config).unwrap();

        let reference = place_image(&numbered.parts[0], "Bracket-A", &config).unwrap();
        assert!(reference.unwrap().ends_with("Bracket-A.jpeg"));
        assert!(dir.path().join("Bracket-A.jpeg").is_file());
        assert!(!numbered.parts[0].exists());

        assert_eq!(place_image(&numbered.parts[0], "Again", &config).unwrap(), None);
    }
}
