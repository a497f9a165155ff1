//! CLI binary for manga2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and writes the chapter PDF.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use manga2pdf::{
    chapter_to_pdf, download_name, list_chapter_images, FetchProgressCallback, PageSize,
    PipelineConfig, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback. Downloads finish out of order, so each line
/// names the page it belongs to.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_fetch_start` tells us how many images there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Locating");
        bar.set_message("Searching catalogue…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Downloading");
        self.bar.reset_eta();
    }

    /// Remove the bar when the run fails before `on_fetch_complete`, so the
    /// error is not printed under a live spinner.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl FetchProgressCallback for CliProgressCallback {
    fn on_fetch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Downloading {total} images…"))
        ));
    }

    fn on_asset_complete(&self, index: usize, total: usize, bytes: u64) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{:>7.1} KiB", bytes as f64 / 1024.0)),
        ));
        self.bar.inc(1);
    }

    fn on_asset_error(&self, index: usize, total: usize, error: &str) {
        // Keep long transport errors on one line.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_fetch_complete(&self, total: usize, succeeded: usize) {
        let failed = total.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} images downloaded",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images downloaded  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Download a chapter to ./One_Piece_Chapter_1045.pdf
  manga2pdf "One Piece" 1045

  # Choose the output file and page size
  manga2pdf berserk 1 -o berserk-1.pdf --page-size a5

  # List the image URLs only, as JSON
  manga2pdf --list --json "One Piece" 1045

  # Be gentler with the image CDN
  manga2pdf --concurrency 2 "One Piece" 1045

ENVIRONMENT VARIABLES:
  MANGA2PDF_BASE_URL      Catalogue host (default https://ww8.mangakakalot.tv)
  MANGA2PDF_CONCURRENCY   Simultaneous downloads (default 5)
  RUST_LOG                Overrides the log filter chosen by -v / -q
"#;

/// Download a manga chapter as a single PDF.
#[derive(Parser, Debug)]
#[command(
    name = "manga2pdf",
    version,
    about = "Download a manga chapter as a single PDF",
    long_about = "Look up a manga chapter in an online catalogue, download its page images \
with bounded concurrency and bind them into one PDF, one page per image. Pages whose \
download fails are left out; the run fails only if no image could be downloaded.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Manga name as shown in the catalogue (e.g. "One Piece").
    source: String,

    /// Chapter identifier (e.g. 1045 or 3.5).
    chapter: String,

    /// Write the PDF here instead of ./<Name>_Chapter_<chapter>.pdf.
    #[arg(short, long, env = "MANGA2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the chapter's image URLs and exit without downloading.
    #[arg(long)]
    list: bool,

    /// Print results as JSON.
    #[arg(long, env = "MANGA2PDF_JSON")]
    json: bool,

    /// Maximum simultaneous downloads.
    #[arg(short, long, env = "MANGA2PDF_CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Output page size.
    #[arg(long, env = "MANGA2PDF_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Custom page width in mm (with --page-height; overrides --page-size).
    #[arg(long, env = "MANGA2PDF_PAGE_WIDTH", requires = "page_height")]
    page_width: Option<f64>,

    /// Custom page height in mm (with --page-width).
    #[arg(long, env = "MANGA2PDF_PAGE_HEIGHT", requires = "page_width")]
    page_height: Option<f64>,

    /// Catalogue host.
    #[arg(long, env = "MANGA2PDF_BASE_URL", default_value = manga2pdf::locator::DEFAULT_BASE_URL)]
    base_url: String,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "MANGA2PDF_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// User agent for catalogue and image requests.
    #[arg(long, env = "MANGA2PDF_USER_AGENT", default_value = manga2pdf::config::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Extension for images whose URL has none.
    #[arg(long, env = "MANGA2PDF_DEFAULT_EXTENSION", default_value = "jpg")]
    default_extension: String,

    /// Zero-padding width of downloaded file names.
    #[arg(long, env = "MANGA2PDF_FILENAME_WIDTH", default_value_t = 3)]
    filename_width: usize,

    /// Disable progress bar.
    #[arg(long, env = "MANGA2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MANGA2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MANGA2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    A5,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::A5 => PageSize::A5,
            PageSizeArg::Letter => PageSize::Letter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list;
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

    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn FetchProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list {
        let listing = list_chapter_images(&cli.source, &cli.chapter, &config)
            .await
            .context("Failed to list chapter images")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&listing).context("Failed to serialise listing")?
            );
        } else {
            for url in &listing.image_urls {
                println!("{url}");
            }
        }
        return Ok(());
    }

    // ── Download + assemble ──────────────────────────────────────────────
    // The work directory holds the raw images and the intermediate PDF; it is
    // removed when `work` drops, on success and on error alike.
    let work = tempfile::Builder::new()
        .prefix("manga2pdf-")
        .tempdir()
        .context("Failed to create work directory")?;

    let result = chapter_to_pdf(&cli.source, &cli.chapter, work.path(), &config).await;
    if result.is_err() {
        if let Some(ref cb) = cli_progress {
            cb.abandon();
        }
    }
    let output = result.context("Failed to build chapter PDF")?;

    let destination = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(download_name(&cli.source, &cli.chapter)));
    tokio::fs::copy(&output.pdf_path, &destination)
        .await
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if output.is_partial() { cyan("⚠") } else { green("✔") },
            output.stats.pages,
            output.stats.requested,
            output.stats.total_duration_ms,
            bold(&destination.display().to_string()),
        );
        if !show_progress {
            for err in output.fetch_results.failures() {
                eprintln!("   {} {}", red("✗"), dim(&err.to_string()));
            }
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let page_size = match (cli.page_width, cli.page_height) {
        (Some(width), Some(height)) => PageSize::Custom { width, height },
        _ => cli.page_size.into(),
    };

    let mut builder = PipelineConfig::builder()
        .max_concurrency(cli.concurrency)
        .page_size(page_size)
        .base_url(cli.base_url.clone())
        .request_timeout_secs(cli.timeout)
        .user_agent(cli.user_agent.clone())
        .default_extension(cli.default_extension.clone())
        .filename_width(cli.filename_width);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
