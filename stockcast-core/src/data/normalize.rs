//! Bar normalizer: provider payload in, canonical annotated series out.
//!
//! Steps: parse every record (dropping malformed ones), sort ascending by
//! date, keep the most recent `history_limit` bars, then derive MA10, MA50
//! and the crossover signal over what remains.

use super::provider::{DailyPayload, RawQuote, RawSeries};
use crate::domain::{Bar, BarSeries};
use crate::signal::MaCrossover;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

/// Roughly one trading year.
pub const DEFAULT_HISTORY_LIMIT: usize = 251;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single provider record that could not be turned into a bar.
///
/// Recovered locally: the record is dropped and the error is reported
/// alongside the series, never returned as a failure of the whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid date '{raw}'")]
    InvalidDate { raw: String },

    #[error("{date}: missing field '{field}'")]
    MissingField { date: NaiveDate, field: &'static str },

    #[error("{date}: invalid {field} value '{value}'")]
    InvalidNumber {
        date: NaiveDate,
        field: &'static str,
        value: String,
    },

    #[error("{date}: duplicate record")]
    DuplicateDate { date: NaiveDate },
}

/// Output of normalization: the clean series plus every dropped record.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub series: BarSeries,
    pub rejected: Vec<ParseError>,
}

/// Converts raw provider records into an annotated `BarSeries`.
#[derive(Debug, Clone)]
pub struct Normalizer {
    history_limit: usize,
    crossover: MaCrossover,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        assert!(history_limit >= 1, "history_limit must be >= 1");
        Self {
            history_limit,
            crossover: MaCrossover::default_params(),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Normalize a full provider payload. A missing series section yields an
    /// empty series.
    pub fn normalize(&self, payload: &DailyPayload) -> Normalized {
        match &payload.time_series {
            Some(raw) => self.normalize_series(raw),
            None => Normalized::default(),
        }
    }

    /// Normalize a date-string to quote mapping.
    pub fn normalize_series(&self, raw: &RawSeries) -> Normalized {
        // Visit keys in a fixed order so duplicates and rejections are reported
        // identically run to run regardless of map iteration order.
        let mut keys: Vec<&String> = raw.keys().collect();
        keys.sort();

        let mut bars = Vec::with_capacity(raw.len());
        let mut rejected = Vec::new();
        for key in keys {
            match parse_record(key, &raw[key]) {
                Ok(bar) => {
                    if !bar.is_sane() {
                        debug!(date = %bar.date, "OHLC values inconsistent, keeping record");
                    }
                    bars.push(bar);
                }
                Err(e) => {
                    warn!(error = %e, "skipping malformed record");
                    rejected.push(e);
                }
            }
        }

        bars.sort_by_key(|b| b.date);
        let before = bars.len();
        let mut duplicates = Vec::new();
        bars.dedup_by(|later, earlier| {
            let dup = later.date == earlier.date;
            if dup {
                duplicates.push(later.date);
            }
            dup
        });
        debug_assert_eq!(before - bars.len(), duplicates.len());
        for date in duplicates {
            warn!(%date, "dropping duplicate record");
            rejected.push(ParseError::DuplicateDate { date });
        }

        if bars.len() > self.history_limit {
            bars.drain(..bars.len() - self.history_limit);
        }

        self.crossover.annotate(&mut bars);

        // Sorted and deduplicated above, so construction cannot fail.
        let series = BarSeries::new(bars).unwrap_or_default();
        Normalized { series, rejected }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize with the default history limit.
pub fn normalize(payload: &DailyPayload) -> Normalized {
    Normalizer::new().normalize(payload)
}

/// Parse one provider record into a raw (unannotated) bar.
pub fn parse_record(date: &str, quote: &RawQuote) -> Result<Bar, ParseError> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| {
        ParseError::InvalidDate {
            raw: date.to_string(),
        }
    })?;

    let open = parse_field(date, "open", quote.open.as_deref())?;
    let high = parse_field(date, "high", quote.high.as_deref())?;
    let low = parse_field(date, "low", quote.low.as_deref())?;
    let close = parse_field(date, "close", quote.close.as_deref())?;
    let volume = parse_field(date, "volume", quote.volume.as_deref())?;

    Ok(Bar::raw(date, open, high, low, close, volume))
}

/// Prices and volume must be finite and non-negative.
fn parse_field(date: NaiveDate, field: &'static str, raw: Option<&str>) -> Result<f64, ParseError> {
    let raw = raw.ok_or(ParseError::MissingField { date, field })?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            date,
            field,
            value: raw.to_string(),
        }),
    }
}
