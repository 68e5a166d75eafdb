//! CLI binary for nestquote.
//!
//! A thin shim over the library crate: maps flags to `IngestConfig`, runs
//! one batch, prices the quote and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use nestquote::sync::upload_over_http;
use nestquote::{
    ingest_nests, FieldPatterns, IngestConfig, IngestProgressCallback, PaintInventory,
    ProgressCallback, Quote, QuotePriceCalculator, QuoteTotals, SheetSettings,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders one bar over the batch and a log line per nest report.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} nests  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Reading");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, parts: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{parts} parts")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, name: &str, _error: &str) {
        self.bar
            .println(format!("  {} {:>3}/{:<3}  {}", red("✗"), index, total, name));
        self.bar.abandon();
    }

    fn on_batch_complete(&self, nests: usize, grouped_parts: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} nests, {} quote lines",
            green("✔"),
            bold(&nests.to_string()),
            bold(&grouped_parts.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Read every nest report in a folder and print the quote summary
  nestquote nests/

  # Price with the shop's sheet and paint settings, save the quote
  nestquote --settings sheet_settings.json --paint paint_inventory.json \
            --quote-name "Job 4417" nests/*.pdf -o job-4417.json

  # Custom field patterns for a different report layout
  nestquote --patterns regex.json nests/

  # Print the whole quote as JSON
  nestquote --json nests/ > quote.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  NESTQUOTE_SETTINGS      Sheet settings JSON
  NESTQUOTE_PAINT         Paint inventory JSON
  NESTQUOTE_PATTERNS      Field pattern overrides JSON
  NESTQUOTE_IMAGE_DIR     Where nest and part pictures are written
  NESTQUOTE_REMOTE        Base URL of the remote quote store
"#;

/// Turn laser nest PDF reports into a costed quote.
#[derive(Parser, Debug)]
#[command(
    name = "nestquote",
    version,
    about = "Turn laser nest PDF reports into a costed quote",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Nest report PDFs, or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Sheet settings JSON (prices, densities, laser rates, material ids).
    #[arg(long, env = "NESTQUOTE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Paint inventory JSON (primers, paints, powders).
    #[arg(long, env = "NESTQUOTE_PAINT")]
    paint: Option<PathBuf>,

    /// Field pattern overrides JSON.
    #[arg(long, env = "NESTQUOTE_PATTERNS")]
    patterns: Option<PathBuf>,

    /// Directory for nest and part pictures.
    #[arg(long, env = "NESTQUOTE_IMAGE_DIR", default_value = "images")]
    image_dir: PathBuf,

    /// Edge length of part thumbnails in pixels.
    #[arg(long, default_value_t = 100)]
    size_of_picture: u32,

    /// Name of the quote.
    #[arg(long, default_value = "Quote")]
    quote_name: String,

    /// Save the quote JSON to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the quote as JSON on stdout instead of the summary.
    #[arg(long)]
    json: bool,

    /// Cutting method whose laser rate prices the quote (default CO2).
    #[arg(long)]
    laser_cutting_method: Option<String>,

    /// Lower every part's cost of goods until items total the sheet cost.
    #[arg(long)]
    match_item_to_sheet: bool,

    /// Suggest the sheet profit margin that makes sheets total the items.
    #[arg(long)]
    match_sheet_to_item: bool,

    /// Upload the quote and its pictures to this remote store.
    #[arg(long, env = "NESTQUOTE_REMOTE")]
    remote: Option<String>,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NESTQUOTE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NESTQUOTE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load settings ────────────────────────────────────────────────────
    let sheet_settings = match &cli.settings {
        Some(path) => SheetSettings::load(path)
            .with_context(|| format!("Failed to read sheet settings from {:?}", path))?,
        None => SheetSettings::default(),
    };
    let paint_inventory = match &cli.paint {
        Some(path) => PaintInventory::load(path)
            .with_context(|| format!("Failed to read paint inventory from {:?}", path))?,
        None => PaintInventory::default(),
    };

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn IngestProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    // ── Ingest ───────────────────────────────────────────────────────────
    let report = ingest_nests(&cli.inputs, &config, &sheet_settings)
        .await
        .context("Ingestion failed")?;
    if !cli.quiet {
        for issue in &report.image_issues {
            eprintln!("  {} {}", cyan("⚠"), issue);
        }
    }
    let mut quote = report.quote;

    // ── Price ────────────────────────────────────────────────────────────
    if let Some(ref method) = cli.laser_cutting_method {
        quote.set_laser_cutting_method(method.as_str(), &sheet_settings);
    }
    if cli.match_item_to_sheet {
        quote.update_settings(|s| s.match_item_to_sheet_cost = true);
    }
    let calculator = QuotePriceCalculator::new(&sheet_settings, &paint_inventory, quote.settings());
    calculator.update_laser_cut_parts_cost(&mut quote);
    let totals = calculator.totals(&quote);

    if cli.match_sheet_to_item && !cli.quiet {
        let margin = calculator.match_sheet_cost_to_item(&quote);
        eprintln!("Sheet profit margin matching item total: {}", bold(&format!("{margin}%")));
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = quote.to_json().context("Failed to serialise quote")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&quote, &totals);
    }

    if let Some(ref path) = cli.output {
        quote
            .save_json(path)
            .with_context(|| format!("Failed to write quote to {:?}", path))?;
        if !cli.quiet {
            eprintln!("{} quote saved to {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if let Some(ref base_url) = cli.remote {
        let images: Vec<PathBuf> = quote
            .nests()
            .iter()
            .map(|n| PathBuf::from(&n.image_path))
            .chain(
                quote
                    .grouped_laser_cut_parts()
                    .iter()
                    .map(|l| PathBuf::from(&l.part.image_path)),
            )
            .filter(|p| p.exists() && p.as_path() != std::path::Path::new(&config.placeholder_image))
            .collect();
        let (_, uploaded) = upload_over_http(base_url.clone(), 60, quote, images)
            .await
            .with_context(|| format!("Failed to upload to {base_url}"))?;
        if !cli.quiet {
            eprintln!(
                "{} quote and {} pictures uploaded to {}",
                green("✔"),
                uploaded,
                bold(base_url)
            );
        }
    }

    Ok(())
}

/// Map CLI args to `IngestConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IngestConfig> {
    let patterns = match &cli.patterns {
        Some(path) => FieldPatterns::load(path)
            .with_context(|| format!("Failed to read field patterns from {:?}", path))?,
        None => FieldPatterns::default(),
    };

    let mut builder = IngestConfig::builder()
        .image_dir(&cli.image_dir)
        .size_of_picture(cli.size_of_picture)
        .quote_name(cli.quote_name.as_str())
        .patterns(patterns);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn print_summary(quote: &Quote, totals: &QuoteTotals) {
    println!("{}", bold(quote.name()));
    println!();
    for nest in quote.nests() {
        println!(
            "  {:<32} {:>3} x {:<24} scrap {:>5.1}%  cut {}",
            nest.name,
            nest.sheet_count,
            nest.sheet.name(),
            nest.scrap_percentage,
            nest.total_cutting_time(),
        );
        for line in nest.recut_summary().lines() {
            println!("      {}", red(line));
        }
    }
    println!();
    for line in quote.grouped_laser_cut_parts() {
        let part = &line.part;
        println!(
            "  {:<32} {:>5}  {:>10.2}  {}",
            part.name,
            part.quantity,
            part.price,
            dim(&format!("{} {}", part.gauge, part.material)),
        );
    }
    println!();
    println!("  Stock cost      {:>12.2}", totals.stock_cost);
    println!("  Cutting cost    {:>12.2}", totals.cutting_cost);
    println!("  Sheet cost      {:>12.2}", totals.sheet_cost);
    println!("  Item cost       {:>12.2}", totals.item_cost);
    println!("  Component cost  {:>12.2}", totals.component_cost);
    println!("  {}  {:>12.2}", bold("Grand total   "), totals.grand_total);
}
