//! Configuration for nest ingestion.
//!
//! All ingestion behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. The regex table travels with the config so
//! a batch always sees one consistent set of patterns.
//!
//! # Example
//! ```rust
//! use nestquote::IngestConfig;
//!
//! let config = IngestConfig::builder()
//!     .image_dir("images")
//!     .size_of_picture(120)
//!     .quote_name("Job 4417")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.size_of_picture, 120);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::NestQuoteError;
use crate::pipeline::fields::FieldPatterns;
use crate::progress::ProgressCallback;

/// Configuration for one ingestion batch.
#[derive(Clone)]
pub struct IngestConfig {
    /// Directory the nest and part pictures are written to. Default: `images`.
    pub image_dir: PathBuf,

    /// Edge length, in pixels, of the square part thumbnails. Default: 100.
    pub size_of_picture: u32,

    /// Exact pixel size of a nest overview picture. Default: 580 × 440.
    pub nest_image_size: (u32, u32),

    /// Exact pixel size of the decorative icons to skip. Default: 48 × 48.
    pub icon_size: (u32, u32),

    /// Picture reference used when a nest or part picture is missing.
    /// Default: `images/404.jpeg`.
    pub placeholder_image: String,

    /// Named regex table applied to each report's text.
    pub patterns: FieldPatterns,

    /// Name given to the quote the batch produces. Default: `Quote`.
    pub quote_name: String,

    /// Optional progress callback for batch and file events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("images"),
            size_of_picture: 100,
            nest_image_size: (580, 440),
            icon_size: (48, 48),
            placeholder_image: "images/404.jpeg".to_string(),
            patterns: FieldPatterns::default(),
            quote_name: "Quote".to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("image_dir", &self.image_dir)
            .field("size_of_picture", &self.size_of_picture)
            .field("nest_image_size", &self.nest_image_size)
            .field("icon_size", &self.icon_size)
            .field("placeholder_image", &self.placeholder_image)
            .field("quote_name", &self.quote_name)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl IngestConfig {
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn image_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.image_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn size_of_picture(mut self, px: u32) -> Self {
        self.config.size_of_picture = px;
        self
    }

    pub fn nest_image_size(mut self, width: u32, height: u32) -> Self {
        self.config.nest_image_size = (width, height);
        self
    }

    pub fn icon_size(mut self, width: u32, height: u32) -> Self {
        self.config.icon_size = (width, height);
        self
    }

    pub fn placeholder_image(mut self, reference: impl Into<String>) -> Self {
        self.config.placeholder_image = reference.into();
        self
    }

    pub fn patterns(mut self, patterns: FieldPatterns) -> Self {
        self.config.patterns = patterns;
        self
    }

    pub fn quote_name(mut self, name: impl Into<String>) -> Self {
        self.config.quote_name = name.into();
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, NestQuoteError> {
        let c = &self.config;
        if c.size_of_picture == 0 {
            return Err(NestQuoteError::InvalidConfig(
                "size_of_picture must be at least 1 px".into(),
            ));
        }
        if c.nest_image_size == c.icon_size {
            return Err(NestQuoteError::InvalidConfig(format!(
                "nest picture size {:?} cannot equal the icon size",
                c.nest_image_size
            )));
        }
        if c.image_dir.as_os_str().is_empty() {
            return Err(NestQuoteError::InvalidConfig("image_dir cannot be empty".into()));
        }
        if c.quote_name.trim().is_empty() {
            return Err(NestQuoteError::InvalidConfig("quote_name cannot be blank".into()));
        }
        // surface bad patterns before any file is touched
        c.patterns.compile()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fields::Field;

    #[test]
    fn defaults_match_shop_layout() {
        let config = IngestConfig::default();
        assert_eq!(config.size_of_picture, 100);
        assert_eq!(config.nest_image_size, (580, 440));
        assert_eq!(config.icon_size, (48, 48));
        assert_eq!(config.placeholder_image, "images/404.jpeg");
    }

    #[test]
    fn zero_picture_size_is_rejected() {
        let err = IngestConfig::builder().size_of_picture(0).build().unwrap_err();
        assert!(matches!(err, NestQuoteError::InvalidConfig(_)));
    }

    #[test]
    fn nest_and_icon_sizes_must_differ() {
        let err = IngestConfig::builder().nest_image_size(48, 48).build().unwrap_err();
        assert!(err.to_string().contains("icon"));
    }

    #[test]
    fn broken_pattern_fails_at_build() {
        let mut patterns = FieldPatterns::default();
        patterns.set(Field::Weight, "[");
        let err = IngestConfig::builder().patterns(patterns).build().unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION");
    }
}
