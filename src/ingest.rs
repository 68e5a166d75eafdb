//! Batch ingestion: turn a list of nest reports into one [`Quote`].
//!
//! Files are processed one at a time, in the order given, on a single
//! blocking worker. Picture numbering is shared across the whole batch. The
//! first fatal error stops the batch and is reported with the name of the
//! file being processed; nothing already written to the image directory is
//! rolled back.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::error::{ImageIssue, NestQuoteError, NestQuoteResult};
use crate::model::Quote;
use crate::pipeline::builder::{build_nest, BuiltNest, NestFields};
use crate::pipeline::extract::{extract_text, NestLoader, PdfiumLoader};
use crate::pipeline::fields::FieldMatcher;
use crate::pipeline::images::{write_numbered_images, ImageCounter};
use crate::pipeline::input;
use crate::progress::{IngestProgressCallback, NoopProgressCallback};
use crate::settings::SheetSettings;

/// The outcome of a successful batch.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Nests sorted by name, grouped parts computed.
    pub quote: Quote,
    /// Picture problems that fell back to the placeholder.
    pub image_issues: Vec<ImageIssue>,
}

/// The single message a background batch delivers.
#[derive(Debug, Clone)]
pub enum IngestMessage {
    Finished(IngestReport),
    /// Human-readable error naming the file that failed.
    Failed(String),
}

/// Ingest a batch of reports through an explicit loader.
///
/// Paths are used as given; see [`ingest_nests`] for validation and
/// directory expansion.
pub fn ingest_with_loader(
    loader: &dyn NestLoader,
    paths: &[PathBuf],
    config: &IngestConfig,
    settings: &SheetSettings,
) -> NestQuoteResult<IngestReport> {
    let matcher = config.patterns.compile()?;
    std::fs::create_dir_all(&config.image_dir).map_err(|source| NestQuoteError::Io {
        path: config.image_dir.clone(),
        source,
    })?;

    let noop = NoopProgressCallback;
    let progress: &dyn IngestProgressCallback = match &config.progress_callback {
        Some(cb) => cb.as_ref(),
        None => &noop,
    };

    let total = paths.len();
    progress.on_batch_start(total);
    info!("Ingesting {} nest report(s)", total);

    let mut quote = Quote::with_sheet_settings(config.quote_name.clone(), settings);
    let mut counter = ImageCounter::new();
    let mut image_issues = Vec::new();

    for (i, path) in paths.iter().enumerate() {
        let name = display_name(path);
        progress.on_file_start(i + 1, total, &name);

        match ingest_file(loader, path, &matcher, &mut counter, config, settings) {
            Ok(BuiltNest { nest, image_issues: issues }) => {
                let parts = nest.laser_cut_parts.len();
                info!("[{}/{}] {}: {} parts on {} sheet(s)", i + 1, total, name, parts, nest.sheet_count);
                for issue in &issues {
                    warn!("{issue}");
                }
                image_issues.extend(issues);
                quote.add_nest(nest);
                progress.on_file_complete(i + 1, total, &name, parts);
            }
            Err(e) => {
                let e = e.in_file(path);
                progress.on_file_error(i + 1, total, &name, &e.to_string());
                return Err(e);
            }
        }
    }

    quote.sort_nests();
    quote.group_laser_cut_parts();
    debug!(
        part_images = counter.parts_written(),
        nest_images = counter.nests_written(),
        "batch pictures"
    );
    progress.on_batch_complete(quote.nests().len(), quote.grouped_laser_cut_parts().len());

    Ok(IngestReport {
        quote,
        image_issues,
    })
}

fn ingest_file(
    loader: &dyn NestLoader,
    path: &Path,
    matcher: &FieldMatcher,
    counter: &mut ImageCounter,
    config: &IngestConfig,
    settings: &SheetSettings,
) -> NestQuoteResult<BuiltNest> {
    let document = loader.load(path)?;
    let text = extract_text(document.as_ref())?;
    // read every field before any picture is written
    let fields = NestFields::read(matcher, &text)?;
    let images = write_numbered_images(document.images()?, counter, config)?;
    build_nest(path, fields, images, &settings.material_id, config)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Ingest nest reports with pdfium.
///
/// Directories expand to the PDFs they contain. The whole batch runs inside
/// one `spawn_blocking` task because pdfium calls block.
pub async fn ingest_nests(
    paths: &[PathBuf],
    config: &IngestConfig,
    settings: &SheetSettings,
) -> NestQuoteResult<IngestReport> {
    let resolved = input::resolve_inputs(paths)?;
    let config = config.clone();
    let settings = settings.clone();

    tokio::task::spawn_blocking(move || {
        let loader = PdfiumLoader::bind()?;
        ingest_with_loader(&loader, &resolved, &config, &settings)
    })
    .await
    .map_err(|e| NestQuoteError::Internal(format!("Ingest task panicked: {e}")))?
}

/// Synchronous wrapper around [`ingest_nests`].
///
/// Creates a temporary tokio runtime internally.
pub fn ingest_nests_sync(
    paths: &[PathBuf],
    config: &IngestConfig,
    settings: &SheetSettings,
) -> NestQuoteResult<IngestReport> {
    tokio::runtime::Runtime::new()
        .map_err(|e| NestQuoteError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(ingest_nests(paths, config, settings))
}

/// Ingest one report held in memory.
///
/// The bytes are written to a temp directory as `name`, which is removed
/// when this returns.
pub async fn ingest_from_bytes(
    name: &str,
    bytes: &[u8],
    config: &IngestConfig,
    settings: &SheetSettings,
) -> NestQuoteResult<IngestReport> {
    let resolved = input::resolve_bytes(name, bytes)?;
    let path = resolved.path().to_path_buf();
    // `resolved` keeps the temp dir alive until the batch returns
    ingest_nests(&[path], config, settings).await
}

/// Turn a batch result into the message delivered to a caller.
pub fn into_message(result: NestQuoteResult<IngestReport>) -> IngestMessage {
    match result {
        Ok(report) => IngestMessage::Finished(report),
        Err(e) => IngestMessage::Failed(format!("[{}] {}", e.error_code(), e)),
    }
}

/// Run a batch on a background thread and deliver exactly one message.
pub fn spawn_ingest<F>(
    paths: Vec<PathBuf>,
    config: IngestConfig,
    settings: SheetSettings,
    on_done: F,
) -> std::thread::JoinHandle<()>
where
    F: FnOnce(IngestMessage) + Send + 'static,
{
    std::thread::spawn(move || {
        let result = ingest_nests_sync(&paths, &config, &settings);
        on_done(into_message(result));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_become_one_string_naming_the_file() {
        let err = NestQuoteError::PatternNoMatch {
            field: "gauge".into(),
        }
        .in_file("/jobs/4417/N-3.pdf");
        match into_message(Err(err)) {
            IngestMessage::Failed(msg) => {
                assert!(msg.starts_with("[CONFIGURATION]"), "got: {msg}");
                assert!(msg.contains("N-3.pdf"));
                assert!(msg.contains("gauge"));
            }
            IngestMessage::Finished(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn missing_input_fails_before_binding_pdfium() {
        let result = ingest_nests_sync(
            &[PathBuf::from("/no/such/nest.pdf")],
            &IngestConfig::default(),
            &SheetSettings::default(),
        );
        assert!(matches!(result, Err(NestQuoteError::FileNotFound { .. })));
    }

    #[test]
    fn spawn_ingest_delivers_one_message() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = spawn_ingest(
            vec![PathBuf::from("/no/such/nest.pdf")],
            IngestConfig::default(),
            SheetSettings::default(),
            move |msg| tx.send(msg).unwrap(),
        );
        handle.join().unwrap();
        let messages: Vec<_> = rx.try_iter().collect();
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], IngestMessage::Failed(_)));
    }
}
