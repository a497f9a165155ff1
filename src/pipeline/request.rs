//! Fetch Result Store: per-index outcomes of one download batch.
//!
//! Workers never append to a shared list. Each request owns one slot in a
//! fixed-size table addressed by its index, written exactly once, so the
//! final order is the request order by construction and completion order
//! cannot leak into the output.

use crate::error::{FetchError, MangaPdfError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// One remote asset to download. `index` is the position in the locator's
/// output and the sole ordering key downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRequest {
    pub index: usize,
    pub location: String,
}

impl AssetRequest {
    pub fn new(index: usize, location: impl Into<String>) -> Self {
        Self {
            index,
            location: location.into(),
        }
    }

    /// Number an ordered list of locations `0..N`.
    pub fn from_locations<I, S>(locations: I) -> Vec<AssetRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        locations
            .into_iter()
            .enumerate()
            .map(|(index, loc)| AssetRequest::new(index, loc))
            .collect()
    }
}

/// Result of downloading a single asset: a local path or the reason it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub index: usize,
    pub result: Result<PathBuf, FetchError>,
}

impl FetchOutcome {
    pub fn success(index: usize, path: PathBuf) -> Self {
        Self {
            index,
            result: Ok(path),
        }
    }

    /// Failed outcome for slot `index`. The slot comes from the request,
    /// never from the error, which a foreign source may have mislabelled.
    pub fn failure(index: usize, error: FetchError) -> Self {
        Self {
            index,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn path(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.result.as_ref().err()
    }
}

/// Slot table shared by the workers of one batch.
#[derive(Debug)]
pub(crate) struct ResultTable {
    slots: Mutex<Vec<Option<FetchOutcome>>>,
}

impl ResultTable {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; len]),
        }
    }

    /// Store an outcome in its own slot. A slot keeps its first outcome.
    pub(crate) fn record(&self, outcome: FetchOutcome) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let len = slots.len();
        match slots.get_mut(outcome.index) {
            Some(slot @ None) => *slot = Some(outcome),
            Some(Some(_)) => warn!("Asset {} recorded twice; keeping first outcome", outcome.index),
            None => warn!("Asset index {} out of range (batch of {})", outcome.index, len),
        }
    }

    /// Close the table. Slots no worker filled become [`FetchError::WorkerAborted`].
    /// Called once all workers have been joined.
    pub(crate) fn finalize(&self) -> FetchResultSet {
        let slots = std::mem::take(&mut *self.slots.lock().unwrap_or_else(PoisonError::into_inner));
        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| FetchOutcome::failure(index, FetchError::WorkerAborted { index }))
            })
            .collect();
        FetchResultSet { outcomes }
    }
}

/// Final, read-only record of a batch: exactly one outcome per index `0..N`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResultSet {
    outcomes: Vec<FetchOutcome>,
}

impl FetchResultSet {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FetchOutcome> {
        self.outcomes.get(index)
    }

    /// Outcomes in index order.
    pub fn iter(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.outcomes.iter().filter_map(FetchOutcome::error)
    }

    /// Local paths of the successful downloads, in ascending index order.
    ///
    /// # Errors
    /// [`MangaPdfError::TotalFetchFailure`] when nothing succeeded.
    pub fn ordered_paths(&self) -> Result<Vec<PathBuf>, MangaPdfError> {
        let paths: Vec<PathBuf> = self
            .outcomes
            .iter()
            .filter_map(|o| o.path().map(Path::to_path_buf))
            .collect();

        if paths.is_empty() {
            let first_error = self
                .failures()
                .next()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no assets requested".to_string());
            return Err(MangaPdfError::TotalFetchFailure {
                total: self.len(),
                first_error,
            });
        }

        Ok(paths)
    }
}

impl<'a> IntoIterator for &'a FetchResultSet {
    type Item = &'a FetchOutcome;
    type IntoIter = std::slice::Iter<'a, FetchOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found(index: usize) -> FetchOutcome {
        FetchOutcome::failure(
            index,
            FetchError::HttpStatus {
                index,
            url: format!("https://cdn.example/{index}.jpg"),
                status: 404,
            },
        )
    }

    #[test]
    fn from_locations_numbers_in_order() {
        let reqs = AssetRequest::from_locations(["a", "b", "c"]);
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[2], AssetRequest::new(2, "c"));
    }

    #[test]
    fn out_of_order_records_come_back_sorted() {
        let table = ResultTable::new(4);
        table.record(FetchOutcome::success(3, "/d/004.jpg".into()));
        table.record(not_found(1));
        table.record(FetchOutcome::success(0, "/d/001.jpg".into()));
        table.record(FetchOutcome::success(2, "/d/003.png".into()));
        let set = table.finalize();

        assert_eq!(set.len(), 4);
        assert_eq!(set.success_count(), 3);
        assert_eq!(set.failure_count(), 1);
        let paths = set.ordered_paths().unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/d/001.jpg"),
                PathBuf::from("/d/003.png"),
                PathBuf::from("/d/004.jpg")
            ]
        );
        for (i, o) in set.iter().enumerate() {
            assert_eq!(o.index, i);
        }
    }

    #[test]
    fn missing_slots_become_aborted() {
        let table = ResultTable::new(2);
        table.record(FetchOutcome::success(0, "/d/001.jpg".into()));
        let set = table.finalize();
        assert_eq!(
            set.get(1).and_then(FetchOutcome::error),
            Some(&FetchError::WorkerAborted { index: 1 })
        );
    }

    #[test]
    fn first_record_wins() {
        let table = ResultTable::new(1);
        table.record(FetchOutcome::success(0, "/d/001.jpg".into()));
        table.record(not_found(0));
        let set = table.finalize();
        assert!(set.get(0).unwrap().is_success());
    }

    #[test]
    fn out_of_range_record_is_ignored() {
        let table = ResultTable::new(1);
        table.record(FetchOutcome::success(5, "/d/006.jpg".into()));
        let set = table.finalize();
        assert_eq!(set.len(), 1);
        assert_eq!(set.success_count(), 0);
    }

    #[test]
    fn all_failed_is_total_failure() {
        let table = ResultTable::new(3);
        for i in 0..3 {
            table.record(not_found(i));
        }
        let set = table.finalize();
        assert_eq!(set.failures().count(), 3);
        match set.ordered_paths() {
            Err(MangaPdfError::TotalFetchFailure { total, first_error }) => {
                assert_eq!(total, 3);
                assert!(first_error.contains("Asset 0"), "got: {first_error}");
            }
            other => panic!("expected TotalFetchFailure, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_total_failure() {
        let set = ResultTable::new(0).finalize();
        assert!(set.is_empty());
        assert!(matches!(
            set.ordered_paths(),
            Err(MangaPdfError::TotalFetchFailure { total: 0, .. })
        ));
    }
}
