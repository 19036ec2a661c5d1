//! Price-data source trait, provider payload types and structured errors.
//!
//! The `PriceSource` trait abstracts over where daily bars come from (the
//! Alpha Vantage API, saved JSON payloads) so the ingest pipeline can swap
//! implementations and tests can run offline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One day's quote exactly as the provider sent it: string fields.
///
/// Every field is optional so a single malformed record is rejected by the
/// normalizer instead of failing deserialization of the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    #[serde(rename = "1. open", default)]
    pub open: Option<String>,
    #[serde(rename = "2. high", default)]
    pub high: Option<String>,
    #[serde(rename = "3. low", default)]
    pub low: Option<String>,
    #[serde(rename = "4. close", default)]
    pub close: Option<String>,
    #[serde(rename = "5. volume", default)]
    pub volume: Option<String>,
}

impl RawQuote {
    pub fn new(open: &str, high: &str, low: &str, close: &str, volume: &str) -> Self {
        Self {
            open: Some(open.to_string()),
            high: Some(high.to_string()),
            low: Some(low.to_string()),
            close: Some(close.to_string()),
            volume: Some(volume.to_string()),
        }
    }
}

/// Date string (`YYYY-MM-DD`) to quote, in no particular order.
pub type RawSeries = HashMap<String, RawQuote>;

/// `TIME_SERIES_DAILY` response body.
///
/// A missing series section is not an error here: the normalizer turns it
/// into an empty series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyPayload {
    #[serde(rename = "Time Series (Daily)", default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<RawSeries>,

    #[serde(rename = "Error Message", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Throttling notice ("Note" on older API versions, "Information" on newer).
    #[serde(rename = "Note", alias = "Information", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DailyPayload {
    pub fn from_series(series: RawSeries) -> Self {
        Self {
            time_series: Some(series),
            ..Self::default()
        }
    }

    /// Number of raw records in the series section (0 if absent).
    pub fn record_count(&self) -> usize {
        self.time_series.as_ref().map_or(0, HashMap::len)
    }
}

/// Structured error types for data source operations.
///
/// These are designed to be displayable in CLI output as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("payload file error for {symbol}: {message}")]
    PayloadFile { symbol: String, message: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for price-data sources (Alpha Vantage, saved payloads).
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the recent daily history for a symbol.
    fn fetch(&self, symbol: &str) -> Result<DailyPayload, DataError>;

    /// Check if the source is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
