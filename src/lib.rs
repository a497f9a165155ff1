//! # manga2pdf
//!
//! Download a manga chapter and bind it into a single PDF, one page per image.
//!
//! ## Pipeline Overview
//!
//! ```text
//! (manga name, chapter)
//!  │
//!  ├─ 1. Locate    search page → manga ID → chapter page → ordered image URLs
//!  ├─ 2. Fetch     bounded-concurrency downloads into a work directory
//!  ├─ 3. Fit       scale each image to the page, never upscaling
//!  └─ 4. Assemble  one PDF page per downloaded image (spawn_blocking)
//! ```
//!
//! Failed downloads do not stop the run: their pages are left out and the
//! outcome is reported per asset. Only a chapter where *every* download fails
//! is an error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use manga2pdf::{chapter_to_pdf, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let work = tempfile::tempdir()?;
//!     let output = chapter_to_pdf("One Piece", "1045", work.path(), &config).await?;
//!     println!("{} pages → {}", output.stats.pages, output.pdf_path.display());
//!     for err in output.fetch_results.failures() {
//!         eprintln!("missing page: {err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `manga2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! manga2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod locator;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSize, PipelineConfig, PipelineConfigBuilder};
pub use convert::{chapter_to_pdf, download_name, images_to_pdf, list_chapter_images};
pub use error::{FetchError, MangaPdfError};
pub use locator::{Locator, MangakakalotLocator};
pub use output::{ChapterImages, ChapterOutput, FetchStats};
pub use pipeline::assemble::{assemble, AssemblyReport};
pub use pipeline::fetch::fetch;
pub use pipeline::format::ImageFormat;
pub use pipeline::geometry::{fit, DrawPlan, ImageDimensions, PageSpec};
pub use pipeline::request::{AssetRequest, FetchOutcome, FetchResultSet};
pub use pipeline::source::{AssetSource, HttpAssetSource};
pub use progress::{FetchProgressCallback, NoopProgressCallback, ProgressCallback};
