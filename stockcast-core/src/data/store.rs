//! Persisted bar store: trait, errors, and an in-memory implementation.
//!
//! The store is the durable owner of every symbol's canonical series. It is
//! append-only: existing rows are never mutated or deleted, and an append
//! either lands completely or not at all.
//!
//! Callers must ensure a single writer per symbol; the store rejects
//! duplicate dates but does not serialize concurrent ingestions.

use crate::domain::{Bar, BarSeries, SeriesError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Store failures. Every variant aborts the operation that raised it with no
/// partial effect; the caller may retry the whole batch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("corrupt store file for {symbol}: {message}")]
    Corrupt { symbol: String, message: String },

    #[error("constraint violation: {symbol} already has a row for {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },

    #[error("stored rows for {symbol} are out of order: {source}")]
    Order {
        symbol: String,
        #[source]
        source: SeriesError,
    },
}

/// Durable per-symbol bar storage.
pub trait BarStore: Send + Sync {
    /// Every date already persisted for `symbol` (empty if none).
    fn existing_dates(&self, symbol: &str) -> Result<BTreeSet<NaiveDate>, StoreError>;

    /// Append `rows` for `symbol`, returning how many were inserted.
    ///
    /// Fails with `DuplicateDate`, writing nothing, if any row's date is
    /// already stored or repeats within `rows`.
    fn append(&self, symbol: &str, rows: &[Bar]) -> Result<usize, StoreError>;

    /// The full stored series for `symbol`, ascending by date.
    fn load(&self, symbol: &str) -> Result<BarSeries, StoreError>;

    /// Symbols with at least one stored row, sorted.
    fn symbols(&self) -> Result<Vec<String>, StoreError>;
}

/// Check `rows` against `existing` and against each other.
pub(crate) fn check_no_duplicates(
    symbol: &str,
    existing: &BTreeSet<NaiveDate>,
    rows: &[Bar],
) -> Result<(), StoreError> {
    let mut seen = BTreeSet::new();
    for bar in rows {
        if existing.contains(&bar.date) || !seen.insert(bar.date) {
            return Err(StoreError::DuplicateDate {
                symbol: symbol.to_string(),
                date: bar.date,
            });
        }
    }
    Ok(())
}

/// In-memory store keyed by symbol then date.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, BTreeMap<NaiveDate, Bar>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BTreeMap<NaiveDate, Bar>>> {
        // Appends validate before mutating, so a poisoned map is still consistent.
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Total stored rows for a symbol.
    pub fn row_count(&self, symbol: &str) -> usize {
        self.lock().get(symbol).map_or(0, BTreeMap::len)
    }
}

impl BarStore for MemoryStore {
    fn existing_dates(&self, symbol: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
        Ok(self
            .lock()
            .get(symbol)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default())
    }

    fn append(&self, symbol: &str, rows: &[Bar]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut all = self.lock();
        let existing: BTreeSet<NaiveDate> = all
            .get(symbol)
            .map(|r| r.keys().copied().collect())
            .unwrap_or_default();
        check_no_duplicates(symbol, &existing, rows)?;

        let entry = all.entry(symbol.to_string()).or_default();
        for bar in rows {
            entry.insert(bar.date, bar.clone());
        }
        Ok(rows.len())
    }

    fn load(&self, symbol: &str) -> Result<BarSeries, StoreError> {
        let bars: Vec<Bar> = self
            .lock()
            .get(symbol)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        BarSeries::new(bars).map_err(|source| StoreError::Order {
            symbol: symbol.to_string(),
            source,
        })
    }

    fn symbols(&self) -> Result<Vec<String>, StoreError> {
        let mut symbols: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(s, _)| s.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}
