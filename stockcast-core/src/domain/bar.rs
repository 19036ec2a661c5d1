//! Bar: one trading day for one symbol, with derived indicators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Daily OHLCV bar with its trailing moving averages and crossover signal.
///
/// `ma10` / `ma50` are `None` until enough history exists. Any computation
/// that touches an undefined average yields an undefined result; there is no
/// NaN sentinel anywhere in this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ma10: Option<f64>,
    pub ma50: Option<f64>,
    pub signal: Signal,
}

impl Bar {
    /// A bar with only raw OHLCV populated (no indicators, `Hold`).
    pub fn raw(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            ma10: None,
            ma50: None,
            signal: Signal::Hold,
        }
    }

    /// Basic OHLC sanity check: high >= low, and open/close within the range.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
            && self.volume >= 0.0
    }
}

/// Categorical trend indicator derived from the MA10 / MA50 crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal '{0}' (expected BUY, SELL or HOLD)")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Signal::Buy),
            "SELL" => Ok(Signal::Sell),
            "HOLD" => Ok(Signal::Hold),
            other => Err(UnknownSignal(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::raw(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000.0,
        )
    }

    #[test]
    fn raw_bar_defaults_to_hold_without_averages() {
        let bar = sample_bar();
        assert_eq!(bar.signal, Signal::Hold);
        assert!(bar.ma10.is_none());
        assert!(bar.ma50.is_none());
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn signal_string_forms() {
        for signal in [Signal::Buy, Signal::Sell, Signal::Hold] {
            assert_eq!(signal.as_str().parse::<Signal>().unwrap(), signal);
        }
        assert!("buy".parse::<Signal>().is_err());
    }

    #[test]
    fn bar_serializes_signal_uppercase_and_null_averages() {
        let json = serde_json::to_value(sample_bar()).unwrap();
        assert_eq!(json["signal"], "HOLD");
        assert!(json["ma10"].is_null());
    }
}
