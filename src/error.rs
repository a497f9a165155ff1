//! Error types for the manga2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MangaPdfError`] — **Fatal**: the chapter cannot be produced at all
//!   (manga not found, every download failed, an image is unreadable, the
//!   PDF could not be written). Returned as `Err(MangaPdfError)` from the
//!   top-level entry points.
//!
//! * [`FetchError`] — **Non-fatal**: a single asset failed to download but
//!   its siblings may be fine. Stored inside
//!   [`crate::pipeline::request::FetchOutcome`] so callers can inspect
//!   partial success rather than losing the whole chapter to one bad page.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the manga2pdf library.
///
/// Per-asset download failures use [`FetchError`] and are recorded in the
/// [`crate::pipeline::request::FetchResultSet`] rather than propagated here.
#[derive(Debug, Error)]
pub enum MangaPdfError {
    // ── Locator errors ────────────────────────────────────────────────────
    /// No search result matched the requested source name.
    #[error("Manga '{name}' not found")]
    MangaNotFound { name: String },

    /// The chapter page exists but lists no images (or does not exist).
    #[error("No images found for chapter {chapter} of manga ID '{manga_id}'")]
    ChapterNotFound { manga_id: String, chapter: String },

    /// The remote catalogue could not be reached or answered with an error.
    #[error("Locator unavailable while requesting '{url}': {reason}")]
    LocatorUnavailable { url: String, reason: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// Every requested asset failed; there is nothing to assemble.
    #[error("All {total} image downloads failed.\nFirst error: {first_error}")]
    TotalFetchFailure { total: usize, first_error: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// An image header reported a zero width or height.
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },

    /// An image could not be opened or its format could not be identified.
    #[error("Unreadable image '{path}': {detail}")]
    UnreadableImage { path: PathBuf, detail: String },

    /// The assembled document could not be created or written.
    #[error("Failed to write document '{path}': {source}")]
    DocumentWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or argument validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single asset.
///
/// Stored in [`crate::pipeline::request::FetchOutcome`] when a download
/// fails. The batch continues unless ALL assets fail.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FetchError {
    /// The location is not an absolute HTTP/HTTPS URL.
    #[error("Asset {index}: invalid location '{location}'")]
    InvalidLocation { index: usize, location: String },

    /// Connection, TLS or body-transfer failure.
    #[error("Asset {index}: request to '{url}' failed: {detail}")]
    Network {
        index: usize,
        url: String,
        detail: String,
    },

    /// The per-request timeout elapsed.
    #[error("Asset {index}: request to '{url}' timed out")]
    Timeout { index: usize, url: String },

    /// The server answered with a non-success status.
    #[error("Asset {index}: '{url}' returned HTTP {status}")]
    HttpStatus {
        index: usize,
        url: String,
        status: u16,
    },

    /// The body arrived but could not be written to disk.
    #[error("Asset {index}: failed to write '{path}': {detail}")]
    WriteFailed {
        index: usize,
        path: PathBuf,
        detail: String,
    },

    /// The worker task panicked or was cancelled before recording a result.
    #[error("Asset {index}: download task aborted")]
    WorkerAborted { index: usize },
}

impl FetchError {
    /// Index of the asset this error belongs to.
    pub fn index(&self) -> usize {
        match self {
            FetchError::InvalidLocation { index, .. }
            | FetchError::Network { index, .. }
            | FetchError::Timeout { index, .. }
            | FetchError::HttpStatus { index, .. }
            | FetchError::WriteFailed { index, .. }
            | FetchError::WorkerAborted { index } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_fetch_failure_display() {
        let e = MangaPdfError::TotalFetchFailure {
            total: 12,
            first_error: "Asset 0: 'https://x/1.jpg' returned HTTP 404".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 12"), "got: {msg}");
        assert!(msg.contains("HTTP 404"), "got: {msg}");
    }

    #[test]
    fn http_status_display() {
        let e = FetchError::HttpStatus {
            index: 2,
            url: "https://cdn.example/003.jpg".into(),
            status: 404,
        };
        assert!(e.to_string().contains("HTTP 404"));
        assert!(e.to_string().contains("Asset 2"));
    }

    #[test]
    fn fetch_error_index() {
        assert_eq!(FetchError::WorkerAborted { index: 7 }.index(), 7);
        let e = FetchError::Timeout {
            index: 3,
            url: "https://cdn.example/a.png".into(),
        };
        assert_eq!(e.index(), 3);
    }

    #[test]
    fn fetch_error_serialises() {
        let e = FetchError::InvalidLocation {
            index: 0,
            location: "not a url".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("InvalidLocation"));
        let back: FetchError = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, e);
    }
}
