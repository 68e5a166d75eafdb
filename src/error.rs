//! Error types for the nestquote library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`NestQuoteError`]: **Fatal**, the nest report cannot be turned into
//!   a nest at all (a field pattern matched nothing, a dimension string did
//!   not split, the PDF could not be opened). One fatal error aborts the
//!   whole ingestion batch.
//!
//! * [`ImageIssue`]: **Non-fatal**, an expected picture was missing after
//!   numbering. The nest or part keeps a placeholder image reference and
//!   ingestion continues; the issue is recorded on the
//!   [`crate::ingest::IngestReport`].

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type NestQuoteResult<T> = Result<T, NestQuoteError>;

/// All fatal errors returned by the nestquote library.
#[derive(Debug, Error)]
pub enum NestQuoteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Nest file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render failed while reading text or images from a page.
    #[error("Extraction failed for page {page} of '{path}': {detail}")]
    ExtractionFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Configuration errors ──────────────────────────────────────────────
    /// A field pattern in the regex table is not a valid regular expression.
    #[error("Pattern for field '{field}' does not compile: {reason}")]
    InvalidPattern { field: String, reason: String },

    /// The regex table has no entry for a field the builder needs.
    #[error("No pattern configured for field '{field}'")]
    MissingPattern { field: String },

    /// A required field pattern matched nothing in the nest text.
    #[error("Field '{field}' matched nothing; the pattern does not fit this nest report")]
    PatternNoMatch { field: String },

    /// A per-part field's match count differs from the number of parts in the nest.
    #[error("Field '{field}' has {found} matches but the nest lists {expected} parts (first unmatched index {index})")]
    FieldCountMismatch {
        field: String,
        expected: usize,
        found: usize,
        index: usize,
    },

    /// Material code is absent from the material-ID table.
    #[error("Unknown material id '{code}' in material table")]
    UnknownMaterialId { code: String },

    /// Thickness code is absent from the material-ID table.
    #[error("Unknown thickness id '{code}' in material table")]
    UnknownThicknessId { code: String },

    /// Builder or settings validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Format errors ─────────────────────────────────────────────────────
    /// A sheet dimension string did not split into length and width.
    #[error("Sheet dimension '{value}' is not of the form '<length>x<width>'")]
    MalformedDimension { value: String },

    /// A cut-time string did not split into hours, minutes and seconds.
    #[error("Sheet cut time '{value}' is not of the form 'H:MM:SS'")]
    MalformedCutTime { value: String },

    /// A matched token could not be parsed as a number.
    #[error("Field '{field}' value '{value}' is not a valid number")]
    InvalidNumber { field: String, value: String },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// An error raised while a specific nest file was being processed.
    #[error("{source}\n\nWhile processing nest file: {file}")]
    Batch {
        file: PathBuf,
        #[source]
        source: Box<NestQuoteError>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write or rename a file in the image directory.
    #[error("Failed to write image '{path}': {reason}")]
    ImageWriteFailed { path: PathBuf, reason: String },

    /// Could not read or write a settings, pattern or quote file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialisation or deserialisation failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote store rejected a fetch or store request.
    #[error("Remote store error for '{name}': {reason}")]
    Remote { name: String, reason: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NestQuoteError {
    /// Wrap this error with the nest file that was being processed.
    ///
    /// Already-wrapped errors are returned unchanged so the innermost file
    /// name is the one reported.
    pub fn in_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            NestQuoteError::Batch { .. } => self,
            other => NestQuoteError::Batch {
                file: file.into(),
                source: Box::new(other),
            },
        }
    }

    /// Short error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            NestQuoteError::FileNotFound { .. }
            | NestQuoteError::PermissionDenied { .. }
            | NestQuoteError::NotAPdf { .. } => "INPUT",
            NestQuoteError::CorruptPdf { .. }
            | NestQuoteError::ExtractionFailed { .. }
            | NestQuoteError::PdfiumBindingFailed(_) => "PDF",
            NestQuoteError::InvalidPattern { .. }
            | NestQuoteError::MissingPattern { .. }
            | NestQuoteError::PatternNoMatch { .. }
            | NestQuoteError::FieldCountMismatch { .. }
            | NestQuoteError::UnknownMaterialId { .. }
            | NestQuoteError::UnknownThicknessId { .. }
            | NestQuoteError::InvalidConfig(_) => "CONFIGURATION",
            NestQuoteError::MalformedDimension { .. }
            | NestQuoteError::MalformedCutTime { .. }
            | NestQuoteError::InvalidNumber { .. } => "FORMAT",
            NestQuoteError::Batch { source, .. } => source.error_code(),
            NestQuoteError::ImageWriteFailed { .. }
            | NestQuoteError::Io { .. }
            | NestQuoteError::Remote { .. } => "IO",
            NestQuoteError::Serialization(_) => "SERIALIZATION",
            NestQuoteError::Internal(_) => "INTERNAL",
        }
    }
}

/// A non-fatal problem with a nest or part picture.
///
/// Recorded on the ingest report; the affected record points at the
/// placeholder image instead.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageIssue {
    /// The nest overview picture was not found after numbering.
    #[error("Nest '{nest}': overview picture not found, using placeholder")]
    MissingNestImage { nest: String },

    /// Fewer part thumbnails than parts were found in the nest report.
    #[error("Nest '{nest}': no thumbnail for part '{part}', using placeholder")]
    MissingPartImage { nest: String, part: String },

    /// More part thumbnails than parts were found; extras were discarded.
    #[error("Nest '{nest}': {extra} unassigned part thumbnails discarded")]
    UnassignedPartImages { nest: String, extra: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_error_names_the_file() {
        let e = NestQuoteError::PatternNoMatch {
            field: "weight".into(),
        }
        .in_file("/nests/job-12.pdf");
        let msg = e.to_string();
        assert!(msg.contains("weight"), "got: {msg}");
        assert!(msg.contains("job-12.pdf"), "got: {msg}");
    }

    #[test]
    fn in_file_keeps_innermost_file() {
        let e = NestQuoteError::MalformedCutTime {
            value: "1:2".into(),
        }
        .in_file("first.pdf")
        .in_file("second.pdf");
        let msg = e.to_string();
        assert!(msg.contains("first.pdf"));
        assert!(!msg.contains("second.pdf"));
    }

    #[test]
    fn error_codes_follow_taxonomy() {
        assert_eq!(
            NestQuoteError::PatternNoMatch { field: "x".into() }.error_code(),
            "CONFIGURATION"
        );
        assert_eq!(
            NestQuoteError::MalformedDimension { value: "48".into() }.error_code(),
            "FORMAT"
        );
        let wrapped = NestQuoteError::MalformedDimension { value: "48".into() }.in_file("a.pdf");
        assert_eq!(wrapped.error_code(), "FORMAT");
    }

    #[test]
    fn image_issue_display() {
        let issue = ImageIssue::MissingNestImage {
            nest: "job-12.pdf".into(),
        };
        assert!(issue.to_string().contains("placeholder"));
    }
}
