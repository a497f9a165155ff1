//! Result types returned by the top-level entry points.

use crate::pipeline::request::FetchResultSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ordered image URLs of one chapter, as reported by the locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterImages {
    pub manga_name: String,
    pub chapter: String,
    pub image_urls: Vec<String>,
}

/// Timing and counts for one chapter run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// Assets requested from the fetcher.
    pub requested: usize,
    /// Assets written to disk.
    pub downloaded: usize,
    /// Assets that failed; their pages are missing from the document.
    pub failed: usize,
    /// Pages in the assembled document.
    pub pages: usize,
    pub fetch_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by [`crate::convert::chapter_to_pdf`].
#[derive(Debug, Clone, Serialize)]
pub struct ChapterOutput {
    pub manga_name: String,
    pub chapter: String,
    /// Location of the assembled PDF inside the work directory.
    pub pdf_path: PathBuf,
    /// Suggested attachment name, `<name>_Chapter_<chapter>.pdf`.
    pub download_name: String,
    /// Per-asset outcomes, including failures that did not abort the run.
    pub fetch_results: FetchResultSet,
    pub stats: FetchStats,
}

impl ChapterOutput {
    /// True when at least one page is missing because its download failed.
    pub fn is_partial(&self) -> bool {
        self.stats.failed > 0
    }
}
