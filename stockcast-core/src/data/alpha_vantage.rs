//! Alpha Vantage daily-series source.
//!
//! Calls `TIME_SERIES_DAILY` over blocking HTTP. Handles retries with
//! exponential backoff, provider throttling notices and the circuit breaker.
//!
//! The API answers most failures with HTTP 200 and a JSON body carrying
//! "Error Message" or "Note"/"Information" instead of data, so the body has to
//! be classified after a successful status.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DailyPayload, DataError, PriceSource};
use crate::config::SourceConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF)
}

pub struct AlphaVantageSource {
    client: reqwest::blocking::Client,
    config: SourceConfig,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl AlphaVantageSource {
    pub fn new(config: SourceConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            circuit_breaker,
        })
    }

    /// Query URL for a symbol. The API key is part of the URL, so never log it.
    fn request_url(&self, symbol: &str) -> String {
        format!(
            "{}/query?function=TIME_SERIES_DAILY&symbol={symbol}&outputsize={}&apikey={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.output_size.as_str(),
            self.config.api_key,
        )
    }

    /// Turn a decoded body into a payload or a provider error.
    fn classify(symbol: &str, payload: DailyPayload) -> Result<DailyPayload, DataError> {
        if let Some(message) = &payload.error_message {
            debug!(symbol, message = %message, "provider rejected symbol");
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if payload.time_series.is_none() {
            if let Some(note) = payload.note {
                return Err(DataError::RateLimited(note));
            }
        }
        Ok(payload)
    }

    fn fetch_with_retry(&self, symbol: &str) -> Result<DailyPayload, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = self.request_url(symbol);
        let base_delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                std::thread::sleep(backoff_delay(base_delay, attempt));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    let e = e.without_url();
                    warn!(symbol, attempt, "request failed: {e}");
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.without_url().to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }
            if !status.is_success() {
                return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
            }

            let payload: DailyPayload = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {}",
                    e.without_url()
                ))
            })?;

            return match Self::classify(symbol, payload) {
                Ok(payload) => {
                    self.circuit_breaker.record_success();
                    Ok(payload)
                }
                Err(e @ DataError::RateLimited(_)) => {
                    self.circuit_breaker.record_failure();
                    Err(e)
                }
                Err(e) => Err(e),
            };
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl PriceSource for AlphaVantageSource {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch(&self, symbol: &str) -> Result<DailyPayload, DataError> {
        self.fetch_with_retry(symbol)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
