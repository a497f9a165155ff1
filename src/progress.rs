//! Progress-callback trait for per-asset download events.
//!
//! Inject an [`Arc<dyn FetchProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the fetcher completes each asset. Events arrive in completion
//! order, from several tasks at once.
//!
//! # Example
//!
//! ```rust
//! use manga2pdf::{FetchProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl FetchProgressCallback for Counter {
//!     fn on_asset_complete(&self, _index: usize, _total: usize, _bytes: u64) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the fetcher as it processes each asset.
///
/// All methods default to no-ops so callers only override what they need.
/// `on_asset_complete` and `on_asset_error` may be called concurrently.
pub trait FetchProgressCallback: Send + Sync {
    /// Called once before any download starts.
    fn on_fetch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when an asset has been written to disk.
    ///
    /// # Arguments
    /// * `index` — 0-based request index
    /// * `total` — number of assets in the batch
    /// * `bytes` — size of the written file
    fn on_asset_complete(&self, index: usize, total: usize, bytes: u64) {
        let _ = (index, total, bytes);
    }

    /// Called when an asset failed; the batch continues.
    fn on_asset_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every download task has finished.
    fn on_fetch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FetchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn FetchProgressCallback>;
