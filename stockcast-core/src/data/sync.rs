//! Sync engine: append only the bars the store does not have yet.
//!
//! Re-ingesting identical source data is idempotent: the second run computes
//! an empty delta and appends nothing.

use super::store::{BarStore, StoreError};
use crate::domain::{Bar, BarSeries};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::info;

/// Bars of `series` whose dates are absent from `existing`, in series order.
pub fn compute_delta(series: &BarSeries, existing: &BTreeSet<NaiveDate>) -> Vec<Bar> {
    series
        .iter()
        .filter(|bar| !existing.contains(&bar.date))
        .cloned()
        .collect()
}

/// Outcome of one sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Bars in the incoming series.
    pub incoming: usize,
    /// Bars skipped because their date was already stored.
    pub already_stored: usize,
    /// Bars appended to the store.
    pub appended: usize,
}

/// Look up stored dates for `symbol`, then append the delta.
///
/// Any store failure aborts the whole sync; since the store's append is
/// all-or-nothing, nothing from this call is persisted in that case.
pub fn sync(store: &dyn BarStore, symbol: &str, series: &BarSeries) -> Result<SyncReport, StoreError> {
    let existing = store.existing_dates(symbol)?;
    let delta = compute_delta(series, &existing);

    let appended = if delta.is_empty() {
        info!(symbol, "already up-to-date, no new rows to insert");
        0
    } else {
        let n = store.append(symbol, &delta)?;
        info!(symbol, appended = n, "inserted new rows");
        n
    };

    Ok(SyncReport {
        incoming: series.len(),
        already_stored: series.len() - delta.len(),
        appended,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps a `MemoryStore` and fails reads or appends on demand.
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryStore,
        fail_reads: bool,
        fail_appends: bool,
        append_calls: AtomicUsize,
    }

    impl BarStore for FailingStore {
        fn existing_dates(&self, symbol: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
            if self.fail_reads {
                return Err(StoreError::Io("disk unavailable".into()));
            }
            self.inner.existing_dates(symbol)
        }

        fn append(&self, symbol: &str, rows: &[Bar]) -> Result<usize, StoreError> {
            self.append_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_appends {
                return Err(StoreError::Parquet("write parquet: no space left".into()));
            }
            self.inner.append(symbol, rows)
        }

        fn load(&self, symbol: &str) -> Result<BarSeries, StoreError> {
            self.inner.load(symbol)
        }

        fn symbols(&self) -> Result<Vec<String>, StoreError> {
            self.inner.symbols()
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series_of(days: &[u32]) -> BarSeries {
        BarSeries::new(
            days.iter()
                .map(|&d| Bar::raw(date(d), 1.0, 1.0, 1.0, d as f64, 1.0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn delta_excludes_existing_and_keeps_order() {
        let existing: BTreeSet<_> = [date(1), date(2)].into_iter().collect();
        let delta = compute_delta(&series_of(&[1, 2, 3]), &existing);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].date, date(3));

        let existing: BTreeSet<_> = [date(3)].into_iter().collect();
        let delta = compute_delta(&series_of(&[1, 2, 3, 4]), &existing);
        let dates: Vec<_> = delta.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(4)]);
    }

    #[test]
    fn appends_only_the_new_date() {
        let store = MemoryStore::new();
        store
            .append("IBM", series_of(&[1, 2]).bars())
            .unwrap();

        let report = sync(&store, "IBM", &series_of(&[1, 2, 3])).unwrap();
        assert_eq!(report.appended, 1);
        assert_eq!(report.already_stored, 2);
        assert_eq!(store.row_count("IBM"), 3);
    }

    #[test]
    fn second_sync_is_noop() {
        let store = MemoryStore::new();
        let series = series_of(&[1, 2, 3, 4, 5]);

        assert_eq!(sync(&store, "IBM", &series).unwrap().appended, 5);
        assert_eq!(sync(&store, "IBM", &series).unwrap().appended, 0);
        assert_eq!(store.row_count("IBM"), 5);
    }

    #[test]
    fn existing_rows_are_not_rewritten() {
        let store = MemoryStore::new();
        let original = series_of(&[1]);
        store.append("IBM", original.bars()).unwrap();

        // Same date, different close: must not replace the stored row.
        let mut changed = original.bars().to_vec();
        changed[0].close = 999.0;
        let changed = BarSeries::new(changed).unwrap();

        assert_eq!(sync(&store, "IBM", &changed).unwrap().appended, 0);
        assert_eq!(store.load("IBM").unwrap().closes(), vec![1.0]);
    }

    #[test]
    fn read_failure_aborts_before_appending() {
        let store = FailingStore {
            fail_reads: true,
            ..FailingStore::default()
        };
        let err = sync(&store, "IBM", &series_of(&[1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.append_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.row_count("IBM"), 0);
    }

    #[test]
    fn append_failure_is_propagated_and_stores_nothing() {
        let store = FailingStore::default();
        store.inner.append("IBM", series_of(&[1]).bars()).unwrap();
        let store = FailingStore {
            fail_appends: true,
            ..store
        };

        let err = sync(&store, "IBM", &series_of(&[1, 2, 3])).unwrap_err();
        assert!(matches!(err, StoreError::Parquet(_)));
        assert_eq!(store.append_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.row_count("IBM"), 1);
        assert_eq!(store.load("IBM").unwrap().closes(), vec![1.0]);
    }

    #[test]
    fn up_to_date_series_never_touches_a_failing_writer() {
        let store = FailingStore::default();
        store.inner.append("IBM", series_of(&[1, 2]).bars()).unwrap();
        let store = FailingStore {
            fail_appends: true,
            ..store
        };

        let report = sync(&store, "IBM", &series_of(&[1, 2])).unwrap();
        assert_eq!(report.appended, 0);
        assert_eq!(store.append_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_series_appends_nothing() {
        let store = MemoryStore::new();
        let report = sync(&store, "IBM", &BarSeries::empty()).unwrap();
        assert_eq!(report.appended, 0);
        assert_eq!(report.incoming, 0);
    }
}
