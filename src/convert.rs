//! End-to-end entry points: locate → fetch → assemble.
//!
//! These are the library equivalents of the two read operations a chapter
//! service offers: listing a chapter's image URLs, and producing the chapter
//! as a single PDF. Both validate their identifiers first, then resolve the
//! locator and asset source from the config.

use crate::config::PipelineConfig;
use crate::error::MangaPdfError;
use crate::locator::{Locator, MangakakalotLocator};
use crate::output::{ChapterImages, ChapterOutput, FetchStats};
use crate::pipeline::assemble::{assemble, AssemblyReport};
use crate::pipeline::fetch::fetch;
use crate::pipeline::request::{AssetRequest, FetchResultSet};
use crate::pipeline::source::{AssetSource, HttpAssetSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// File name of the assembled document inside the work directory.
pub const CHAPTER_PDF_NAME: &str = "chapter.pdf";

/// List the image URLs of a chapter without downloading anything.
///
/// # Errors
/// * [`MangaPdfError::InvalidConfig`] — empty name or chapter
/// * any locator error, unchanged
pub async fn list_chapter_images(
    manga_name: &str,
    chapter: &str,
    config: &PipelineConfig,
) -> Result<ChapterImages, MangaPdfError> {
    validate_identifiers(manga_name, chapter)?;
    let locator = resolve_locator(config)?;
    let image_urls = locator.locate(manga_name, chapter).await?;

    Ok(ChapterImages {
        manga_name: manga_name.to_string(),
        chapter: chapter.to_string(),
        image_urls,
    })
}

/// Locate a chapter, download its images into `work_dir` and bind them into
/// `work_dir/chapter.pdf`.
///
/// Succeeds when at least one image was downloaded; missing pages are
/// reported in [`ChapterOutput::fetch_results`]. `work_dir` must exist and
/// is never cleaned up here.
///
/// # Errors
/// * [`MangaPdfError::InvalidConfig`] — empty name or chapter
/// * locator errors, unchanged
/// * [`MangaPdfError::TotalFetchFailure`] — no image could be downloaded
/// * assembly errors ([`MangaPdfError::UnreadableImage`], …)
pub async fn chapter_to_pdf(
    manga_name: &str,
    chapter: &str,
    work_dir: &Path,
    config: &PipelineConfig,
) -> Result<ChapterOutput, MangaPdfError> {
    let total_start = Instant::now();
    validate_identifiers(manga_name, chapter)?;
    info!("Building PDF for '{}' chapter {}", manga_name, chapter);

    // ── Step 1: Locate ───────────────────────────────────────────────────
    let locator = resolve_locator(config)?;
    let urls = locator.locate(manga_name, chapter).await?;

    // ── Step 2–3: Fetch + assemble ───────────────────────────────────────
    let pdf_path = work_dir.join(CHAPTER_PDF_NAME);
    let (fetch_results, report, mut stats) = images_to_pdf(urls, work_dir, &pdf_path, config).await?;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Chapter {} ready: {} pages, {}ms total",
        chapter, report.page_count, stats.total_duration_ms
    );

    Ok(ChapterOutput {
        manga_name: manga_name.to_string(),
        chapter: chapter.to_string(),
        pdf_path: report.output,
        download_name: download_name(manga_name, chapter),
        fetch_results,
        stats,
    })
}

/// Download `urls` into `work_dir` and assemble the successes into `output`.
///
/// This is the pipeline without the locator, for callers that already have
/// the URL list.
pub async fn images_to_pdf(
    urls: Vec<String>,
    work_dir: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<(FetchResultSet, AssemblyReport, FetchStats), MangaPdfError> {
    let source = resolve_source(config)?;
    let requests = AssetRequest::from_locations(urls);

    let fetch_start = Instant::now();
    let results = fetch(&requests, work_dir, config, source).await;
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

    let paths = results.ordered_paths()?;
    if results.failure_count() > 0 {
        warn!(
            "{}/{} images failed to download; their pages will be missing",
            results.failure_count(),
            results.len()
        );
    }

    let assemble_start = Instant::now();
    let report = assemble_blocking(paths, config, output.to_path_buf()).await?;
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

    let stats = FetchStats {
        requested: results.len(),
        downloaded: results.success_count(),
        failed: results.failure_count(),
        pages: report.page_count,
        fetch_duration_ms,
        assemble_duration_ms,
        total_duration_ms: fetch_duration_ms + assemble_duration_ms,
    };
    Ok((results, report, stats))
}

/// Attachment name for a chapter PDF: spaces in the name become underscores.
pub fn download_name(manga_name: &str, chapter: &str) -> String {
    format!("{}_Chapter_{}.pdf", manga_name.replace(' ', "_"), chapter)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn validate_identifiers(manga_name: &str, chapter: &str) -> Result<(), MangaPdfError> {
    if manga_name.trim().is_empty() || chapter.trim().is_empty() {
        return Err(MangaPdfError::InvalidConfig(
            "manga name and chapter are required".into(),
        ));
    }
    Ok(())
}

/// Pre-built locator first, otherwise a catalogue locator for `base_url`.
fn resolve_locator(config: &PipelineConfig) -> Result<Arc<dyn Locator>, MangaPdfError> {
    if let Some(ref locator) = config.locator {
        return Ok(Arc::clone(locator));
    }
    Ok(Arc::new(MangakakalotLocator::new(&config.base_url, config)?))
}

/// Pre-built asset source first, otherwise an HTTP source.
fn resolve_source(config: &PipelineConfig) -> Result<Arc<dyn AssetSource>, MangaPdfError> {
    if let Some(ref source) = config.asset_source {
        return Ok(Arc::clone(source));
    }
    let source = HttpAssetSource::new(config.request_timeout_secs, &config.user_agent)
        .map_err(|e| MangaPdfError::Internal(format!("HTTP client: {e}")))?;
    Ok(Arc::new(source))
}

/// Run the assembler on the blocking pool; it does synchronous file I/O and
/// PNG decoding.
async fn assemble_blocking(
    paths: Vec<PathBuf>,
    config: &PipelineConfig,
    output: PathBuf,
) -> Result<AssemblyReport, MangaPdfError> {
    let page = config.page;
    tokio::task::spawn_blocking(move || assemble(&paths, page, &output))
        .await
        .map_err(|e| MangaPdfError::Internal(format!("Assembly task panicked: {}", e)))?
}
