//! Parquet-backed bar store with Hive-style partitioning.
//!
//! Layout: `{store_dir}/symbol={SYMBOL}/bars.parquet` plus `meta.json`.
//!
//! - Appends rewrite the symbol file through `.tmp` + rename, so a failed
//!   append leaves the previous file untouched (all-or-nothing).
//! - Duplicate dates are rejected before anything is written.
//! - Files that fail to decode are quarantined (`bars.parquet.quarantined`).
//!   I/O failures are returned as-is and never move the file.
//! - While a quarantined file exists the symbol is refused with `Corrupt`
//!   until an operator restores or removes it.
//! - The metadata sidecar records date range, row count and a content hash.

use super::store::{check_no_duplicates, BarStore, StoreError};
use crate::domain::{Bar, BarSeries, Signal};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BARS_FILE: &str = "bars.parquet";
const META_FILE: &str = "meta.json";

const COLUMNS: [&str; 10] = [
    "symbol", "date", "open", "high", "low", "close", "volume", "ma10", "ma50", "signal",
];

/// Metadata sidecar for a stored symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub data_hash: String,
    pub updated_at: chrono::NaiveDateTime,
}

/// Row count and date range for one stored symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatus {
    pub symbol: String,
    pub row_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub struct ParquetStore {
    dir: PathBuf,
}

impl ParquetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/symbol={SYMBOL}/`
    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("symbol={symbol}"))
    }

    fn bars_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(BARS_FILE)
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(META_FILE)
    }

    fn quarantine_path(&self, symbol: &str) -> PathBuf {
        self.bars_path(symbol).with_extension("parquet.quarantined")
    }

    /// Read the metadata sidecar, if present and parseable.
    pub fn get_meta(&self, symbol: &str) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Row counts and date ranges for every stored symbol.
    pub fn status(&self) -> Result<Vec<StoreStatus>, StoreError> {
        self.symbols()?
            .into_iter()
            .map(|symbol| {
                let series = self.load(&symbol)?;
                Ok(StoreStatus {
                    row_count: series.len(),
                    start_date: series.first_date(),
                    end_date: series.last_date(),
                    symbol,
                })
            })
            .collect()
    }

    /// Load raw rows for a symbol; `Ok(vec![])` when nothing is stored.
    fn read_rows(&self, symbol: &str) -> Result<Vec<Bar>, StoreError> {
        let quarantine = self.quarantine_path(symbol);
        if quarantine.exists() {
            return Err(StoreError::Corrupt {
                symbol: symbol.to_string(),
                message: format!(
                    "quarantined file present at {}; restore or remove it",
                    quarantine.display()
                ),
            });
        }

        let path = self.bars_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        match read_parquet(&path) {
            Ok(rows) => Ok(rows),
            Err(StoreError::Parquet(message)) => {
                warn!(
                    symbol,
                    path = %path.display(),
                    error = %message,
                    "quarantining corrupt store file"
                );
                if let Err(e) = fs::rename(&path, &quarantine) {
                    warn!(symbol, error = %e, "failed to quarantine store file");
                }
                Err(StoreError::Corrupt {
                    symbol: symbol.to_string(),
                    message,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn write_meta(&self, symbol: &str, bars: &[Bar]) -> Result<(), StoreError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Ok(());
        };
        let hash_input = serde_json::to_vec(bars)
            .map_err(|e| StoreError::Io(format!("hash serialization: {e}")))?;
        let meta = StoreMeta {
            symbol: symbol.to_string(),
            start_date: first.date,
            end_date: last.date,
            row_count: bars.len(),
            data_hash: blake3::hash(&hash_input).to_hex().to_string(),
            updated_at: chrono::Local::now().naive_local(),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Io(format!("meta serialization: {e}")))?;
        let path = self.meta_path(symbol);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::Io(format!("meta write: {e}")))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io(format!("meta rename: {e}"))
        })
    }
}

impl BarStore for ParquetStore {
    fn existing_dates(&self, symbol: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
        Ok(self.read_rows(symbol)?.into_iter().map(|b| b.date).collect())
    }

    fn append(&self, symbol: &str, rows: &[Bar]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut all = self.read_rows(symbol)?;
        let existing: BTreeSet<NaiveDate> = all.iter().map(|b| b.date).collect();
        check_no_duplicates(symbol, &existing, rows)?;

        all.extend_from_slice(rows);
        all.sort_by_key(|b| b.date);

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;

        let mut df = bars_to_dataframe(symbol, &all)?;
        let path = self.bars_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        if let Err(e) = write_parquet(&mut df, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // Atomic rename: readers see either the old file or the new one.
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        // The data file is authoritative; a stale sidecar only affects reporting.
        if let Err(e) = self.write_meta(symbol, &all) {
            warn!(symbol, error = %e, "failed to update store metadata");
        }

        debug!(symbol, appended = rows.len(), total = all.len(), "parquet append");
        Ok(rows.len())
    }

    fn load(&self, symbol: &str) -> Result<BarSeries, StoreError> {
        let mut rows = self.read_rows(symbol)?;
        rows.sort_by_key(|b| b.date);
        BarSeries::new(rows).map_err(|source| StoreError::Order {
            symbol: symbol.to_string(),
            source,
        })
    }

    fn symbols(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&self.dir).map_err(|e| StoreError::Io(format!("read dir: {e}")))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(format!("dir entry: {e}")))?;
            let name = entry.file_name();
            let Some(symbol) = name.to_str().and_then(|n| n.strip_prefix("symbol=")) else {
                continue;
            };
            if entry.path().join(BARS_FILE).exists() {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// 1970-01-01, the origin of the parquet `Date` physical type.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(symbol: &str, bars: &[Bar]) -> Result<DataFrame, StoreError> {
    let epoch = epoch();
    let symbols: Vec<&str> = vec![symbol; bars.len()];
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let ma10: Vec<Option<f64>> = bars.iter().map(|b| b.ma10).collect();
    let ma50: Vec<Option<f64>> = bars.iter().map(|b| b.ma50).collect();
    let signals: Vec<&str> = bars.iter().map(|b| b.signal.as_str()).collect();

    DataFrame::new(vec![
        Column::new("symbol".into(), symbols),
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("ma10".into(), ma10),
        Column::new("ma50".into(), ma50),
        Column::new("signal".into(), signals),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Io(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// `Io` when the bytes cannot be read, `Parquet` when they cannot be decoded.
fn read_parquet(path: &Path) -> Result<Vec<Bar>, StoreError> {
    let bytes =
        fs::read(path).map_err(|e| StoreError::Io(format!("read {}: {e}", path.display())))?;
    let df = ParquetReader::new(std::io::Cursor::new(bytes))
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read: {e}")))?;

    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(StoreError::Parquet(format!("missing column '{name}'")));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, StoreError> {
    let col_err = |name: &str, e: PolarsError| StoreError::Parquet(format!("{name} column: {e}"));
    let f64_col = |name: &str| {
        df.column(name)
            .and_then(|c| c.f64().cloned())
            .map_err(|e| col_err(name, e))
    };

    let date_ca = df
        .column("date")
        .and_then(|c| c.date().cloned())
        .map_err(|e| col_err("date", e))?;
    let signal_ca = df
        .column("signal")
        .and_then(|c| c.str().cloned())
        .map_err(|e| col_err("signal", e))?;
    let open_ca = f64_col("open")?;
    let high_ca = f64_col("high")?;
    let low_ca = f64_col("low")?;
    let close_ca = f64_col("close")?;
    let volume_ca = f64_col("volume")?;
    let ma10_ca = f64_col("ma10")?;
    let ma50_ca = f64_col("ma50")?;

    let required = |ca: &Float64Chunked, name: &str, i: usize| {
        ca.get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null {name} at row {i}")))
    };

    let epoch = epoch();
    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null date at row {i}")))?;
        let signal = signal_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null signal at row {i}")))?
            .parse::<Signal>()
            .map_err(|e| StoreError::Parquet(format!("row {i}: {e}")))?;

        bars.push(Bar {
            date: epoch + chrono::Duration::days(days as i64),
            open: required(&open_ca, "open", i)?,
            high: required(&high_ca, "high", i)?,
            low: required(&low_ca, "low", i)?,
            close: required(&close_ca, "close", i)?,
            volume: required(&volume_ca, "volume", i)?,
            ma10: ma10_ca.get(i),
            ma50: ma50_ca.get(i),
            signal,
        });
    }

    Ok(bars)
}
