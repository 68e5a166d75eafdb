//! Progress-callback trait for ingestion batch events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::IngestConfigBuilder::progress_callback`] to follow a
//! batch file by file. The batch runs on a blocking worker thread, so the
//! trait is `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use nestquote::{IngestConfig, IngestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     parts: AtomicUsize,
//! }
//!
//! impl IngestProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, _index: usize, _total: usize, _name: &str, parts: usize) {
//!         self.parts.fetch_add(parts, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { parts: AtomicUsize::new(0) });
//! let config = IngestConfig::builder()
//!     .progress_callback(counter as Arc<dyn IngestProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the ingestion batch as it processes each nest report.
///
/// All methods have default no-op implementations. File indices are
/// 1-based.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once before the first file is opened.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is opened.
    fn on_file_start(&self, index: usize, total_files: usize, name: &str) {
        let _ = (index, total_files, name);
    }

    /// Called when a file has been turned into a nest.
    fn on_file_complete(&self, index: usize, total_files: usize, name: &str, parts: usize) {
        let _ = (index, total_files, name, parts);
    }

    /// Called when a file fails. The batch stops after this call.
    fn on_file_error(&self, index: usize, total_files: usize, name: &str, error: &str) {
        let _ = (index, total_files, name, error);
    }

    /// Called once after every file succeeded.
    fn on_batch_complete(&self, nests: usize, grouped_parts: usize) {
        let _ = (nests, grouped_parts);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started: AtomicUsize,
        completed: AtomicUsize,
        errors: AtomicUsize,
    }

    impl IngestProgressCallback for TrackingCallback {
        fn on_file_start(&self, _index: usize, _total: usize, _name: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _name: &str, _parts: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.pdf");
        cb.on_file_complete(1, 2, "a.pdf", 4);
        cb.on_file_error(2, 2, "b.pdf", "no match");
        cb.on_batch_complete(1, 4);
    }

    #[test]
    fn tracking_callback_through_arc() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: ProgressCallback = tracker.clone();
        cb.on_file_start(1, 2, "a.pdf");
        cb.on_file_complete(1, 2, "a.pdf", 3);
        cb.on_file_start(2, 2, "b.pdf");
        cb.on_file_error(2, 2, "b.pdf", "bad gauge");

        assert_eq!(tracker.started.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
