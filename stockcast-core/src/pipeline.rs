//! End-to-end operations: fetch → normalize → sync, and load → features →
//! forecast.
//!
//! Callers must not ingest the same symbol from two places at once; the
//! store rejects duplicate dates but does not lock.

use crate::calendar::next_business_days;
use crate::config::{ForecastConfig, ModelKind};
use crate::data::{sync, BarStore, DataError, Normalizer, PriceSource, StoreError};
use crate::model::{
    build_features, Forecaster, GradientBoostedTrees, LinearRegressor, ModelError, Regressor,
    TrainingReport,
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Trimmed, upper-cased ticker.
pub fn normalize_symbol(symbol: &str) -> Result<String, PipelineError> {
    let s = symbol.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return Err(PipelineError::InvalidSymbol(symbol.to_string()));
    }
    Ok(s.to_ascii_uppercase())
}

// ─── Ingestion ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub symbol: String,
    /// Bars produced by normalization.
    pub fetched: usize,
    /// Raw records dropped as malformed or duplicated.
    pub rejected: usize,
    /// Bars newly written to the store.
    pub appended: usize,
}

/// Fetch one symbol, normalize it and append what the store lacks.
pub fn ingest_symbol(
    source: &dyn PriceSource,
    store: &dyn BarStore,
    normalizer: &Normalizer,
    symbol: &str,
) -> Result<IngestReport, PipelineError> {
    let symbol = normalize_symbol(symbol)?;
    let payload = source.fetch(&symbol)?;
    let normalized = normalizer.normalize(&payload);

    if normalized.series.is_empty() {
        warn!(symbol = %symbol, source = source.name(), "source returned no usable bars");
    }

    let report = sync(store, &symbol, &normalized.series)?;
    Ok(IngestReport {
        symbol,
        fetched: normalized.series.len(),
        rejected: normalized.rejected.len(),
        appended: report.appended,
    })
}

/// Callbacks for batch ingestion.
pub trait IngestProgress: Send {
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<IngestReport, PipelineError>);

    fn on_batch_complete(&self, summary: &IngestSummary);
}

/// Prints batch progress to stdout.
pub struct StdoutProgress;

impl IngestProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Ingesting {symbol}...", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, result: &Result<IngestReport, PipelineError>) {
        match result {
            Ok(r) if r.appended == 0 => println!("  OK: {symbol} already up-to-date ({} bars)", r.fetched),
            Ok(r) => println!("  OK: {symbol} +{} rows ({} fetched, {} rejected)", r.appended, r.fetched, r.rejected),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, summary: &IngestSummary) {
        println!(
            "\nIngest complete: {}/{} succeeded, {} failed, {} rows appended",
            summary.succeeded(),
            summary.total,
            summary.failed(),
            summary.total_appended()
        );
    }
}

#[derive(Debug)]
pub struct IngestSummary {
    pub total: usize,
    pub reports: Vec<IngestReport>,
    pub errors: Vec<(String, PipelineError)>,
}

impl IngestSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_appended(&self) -> usize {
        self.reports.iter().map(|r| r.appended).sum()
    }
}

/// Ingest symbols in order. Once the source reports itself unavailable the
/// remaining symbols are marked failed without being fetched.
pub fn ingest_symbols(
    source: &dyn PriceSource,
    store: &dyn BarStore,
    normalizer: &Normalizer,
    symbols: &[&str],
    progress: &dyn IngestProgress,
) -> IngestSummary {
    let total = symbols.len();
    let mut reports = Vec::new();
    let mut errors = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);
        let result = ingest_symbol(source, store, normalizer, symbol);
        progress.on_complete(symbol, i, total, &result);

        match result {
            Ok(report) => reports.push(report),
            Err(e) => errors.push((symbol.to_string(), e)),
        }

        if !source.is_available() {
            warn!(source = source.name(), remaining = total - i - 1, "source unavailable, stopping batch");
            for sym in &symbols[(i + 1)..] {
                errors.push((sym.to_string(), DataError::CircuitBreakerTripped.into()));
            }
            break;
        }
    }

    let summary = IngestSummary { total, reports, errors };
    progress.on_batch_complete(&summary);
    summary
}

// ─── Forecasting ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub symbol: String,
    pub model: String,
    /// Last stored bar the forecast extends.
    pub last_date: NaiveDate,
    pub points: Vec<ForecastPoint>,
    pub training: TrainingReport,
}

pub fn build_regressor(config: &ForecastConfig) -> Box<dyn Regressor> {
    match config.model {
        ModelKind::Boosted => Box::new(GradientBoostedTrees::with_params(config.boosted.clone())),
        ModelKind::Linear => Box::new(LinearRegressor::new()),
    }
}

/// Load the stored series, train, and date the projected closes on the
/// business days after the last stored bar.
pub fn forecast_symbol(
    store: &dyn BarStore,
    symbol: &str,
    config: &ForecastConfig,
) -> Result<ForecastReport, PipelineError> {
    let symbol = normalize_symbol(symbol)?;
    if config.lags == 0 {
        return Err(ModelError::InvalidParameter("lags must be >= 1".into()).into());
    }

    let series = store.load(&symbol)?;
    let table = build_features(&series, config.lags);
    let last_date = series.last_date().ok_or(ModelError::InsufficientData {
        rows: 0,
        required: 2,
    })?;

    let mut forecaster = Forecaster::new(build_regressor(config), config.settings());
    let forecast = forecaster.forecast(&table, config.horizon)?;

    let points: Vec<ForecastPoint> = next_business_days(last_date, forecast.values.len())
        .into_iter()
        .zip(forecast.values)
        .map(|(date, close)| ForecastPoint { date, close })
        .collect();

    info!(symbol = %symbol, horizon = points.len(), %last_date, "forecast complete");

    Ok(ForecastReport {
        symbol,
        model: forecaster.model().name().to_string(),
        last_date,
        points,
        training: forecast.training,
    })
}
