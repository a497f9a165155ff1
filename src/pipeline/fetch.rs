//! Bounded Fetcher: download an ordered list of assets, at most N at a time.
//!
//! ## Scheduling
//!
//! One tokio task is spawned per request, but each task must take a permit
//! from a shared [`Semaphore`] before it touches the network. The permit is
//! an RAII guard, so it is released on every exit path, including errors
//! and panics inside the source.
//!
//! ## Partial failure
//!
//! A failed download never cancels its siblings. Every outcome lands in its
//! own slot of the result table and the call only returns after every task
//! has finished. Whether the batch as a whole is usable is decided later by
//! [`FetchResultSet::ordered_paths`].

use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::pipeline::request::{AssetRequest, FetchOutcome, FetchResultSet, ResultTable};
use crate::pipeline::source::AssetSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Download every request into `dest_dir`, never running more than
/// `config.max_concurrency` transfers at once.
///
/// Always returns a complete [`FetchResultSet`] with one outcome per request.
/// Files are named `<index+1, zero-padded><.ext>`. Pre-existing files in
/// `dest_dir` are never modified: a request whose file name is already
/// taken fails with [`FetchError::WriteFailed`] (for [`HttpAssetSource`]).
///
/// [`HttpAssetSource`]: crate::pipeline::source::HttpAssetSource
pub async fn fetch(
    requests: &[AssetRequest],
    dest_dir: &Path,
    config: &PipelineConfig,
    source: Arc<dyn AssetSource>,
) -> FetchResultSet {
    let start = Instant::now();
    let total = requests.len();
    let permits = config.max_concurrency.max(1);
    info!("Fetching {} assets (max {} concurrent)", total, permits);

    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_start(total);
    }

    let gate = Arc::new(Semaphore::new(permits));
    let table = Arc::new(ResultTable::new(total));
    let mut workers = JoinSet::new();

    for request in requests.iter().cloned() {
        let gate = Arc::clone(&gate);
        let table = Arc::clone(&table);
        let source = Arc::clone(&source);
        let progress = config.progress_callback.clone();
        let dest = dest_dir.join(asset_filename(
            &request,
            config.filename_width,
            &config.default_extension,
        ));

        workers.spawn(async move {
            let index = request.index;
            let outcome = match gate.acquire_owned().await {
                Ok(_permit) => match source.download(&request, &dest).await {
                    Ok(bytes) => {
                        debug!("Asset {} downloaded ({} bytes)", index, bytes);
                        if let Some(ref cb) = progress {
                            cb.on_asset_complete(index, total, bytes);
                        }
                        FetchOutcome::success(index, dest)
                    }
                    Err(e) => {
                        warn!("Failed to download {}: {}", request.location, e);
                        if let Some(ref cb) = progress {
                            cb.on_asset_error(index, total, &e.to_string());
                        }
                        FetchOutcome::failure(index, e)
                    }
                },
                Err(_) => FetchOutcome::failure(index, FetchError::WorkerAborted { index }),
            };
            table.record(outcome);
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            warn!("Download task ended abnormally: {}", e);
        }
    }

    let results = table.finalize();

    let succeeded = results.success_count();
    info!(
        "Fetched {}/{} assets in {}ms",
        succeeded,
        total,
        start.elapsed().as_millis()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_complete(total, succeeded);
    }

    results
}

/// Local file name for a request: 1-based index, zero-padded, plus the
/// extension of the URL path (or `default_ext` if there is none).
pub fn asset_filename(request: &AssetRequest, width: usize, default_ext: &str) -> PathBuf {
    let ext = location_extension(&request.location).unwrap_or_else(|| {
        default_ext.trim_start_matches('.').to_ascii_lowercase()
    });
    PathBuf::from(format!("{:0width$}.{}", request.index + 1, ext, width = width))
}

/// Extension of the last path segment of a URL, ignoring query and fragment.
fn location_extension(location: &str) -> Option<String> {
    let url = reqwest::Url::parse(location).ok()?;
    let last = url.path_segments()?.next_back()?;
    let (stem, ext) = last.rsplit_once('.')?;
    let valid = !stem.is_empty()
        && !ext.is_empty()
        && ext.len() <= 5
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}
