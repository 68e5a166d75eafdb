//! # nestquote
//!
//! Turn the PDF reports written by sheet-metal nesting software into costed
//! quotes.
//!
//! A nest report describes one sheet layout: the sheet's material, gauge,
//! size and cut time, and a table of the parts cut from it with their
//! quantities, weights, cutting lengths and thumbnails. This crate reads a
//! batch of such reports, builds one [`model::Nest`] per report, collects the
//! nests into a [`model::Quote`] and prices it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! nest PDF
//!  │
//!  ├─ 1. Input    validate the file, expand directories
//!  ├─ 2. Extract  page text and embedded images via pdfium (spawn_blocking)
//!  ├─ 3. Fields   named regex table → sheet values + per-part columns
//!  ├─ 4. Images   icon / nest / part by pixel size, numbered then renamed
//!  ├─ 5. Build    one Nest, parts bound to their thumbnails
//!  └─ 6. Quote    nests sorted, duplicate parts grouped across nests
//! ```
//!
//! Pricing ([`pricing::QuotePriceCalculator`]) runs over a finished quote with
//! the shop's [`settings::SheetSettings`] and [`paint::PaintInventory`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nestquote::{ingest_nests, IngestConfig, SheetSettings};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SheetSettings::load("sheet_settings.json".as_ref())?;
//!     let config = IngestConfig::builder().quote_name("Job 4417").build()?;
//!     let report = ingest_nests(&[PathBuf::from("nests/")], &config, &settings).await?;
//!     for line in report.quote.grouped_laser_cut_parts() {
//!         println!("{} x{}", line.part.name, line.part.quantity);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nestquote` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! nestquote = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod paint;
pub mod pipeline;
pub mod pricing;
pub mod progress;
pub mod settings;
pub mod sync;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IngestConfig, IngestConfigBuilder};
pub use error::{ImageIssue, NestQuoteError, NestQuoteResult};
pub use ingest::{
    ingest_from_bytes, ingest_nests, ingest_nests_sync, ingest_with_loader, spawn_ingest,
    IngestMessage, IngestReport,
};
pub use model::{Component, GroupedLaserCutPart, LaserCutPart, Nest, Quote, QuoteSettings, Sheet};
pub use paint::PaintInventory;
pub use pipeline::fields::{Field, FieldPatterns};
pub use pricing::{QuotePriceCalculator, QuoteTotals};
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback};
pub use settings::SheetSettings;
