//! Moving average crossover: MA10 vs MA50 trend classification.
//!
//! Unlike an event-style crossover (which only fires on the bar where the
//! averages cross), every bar gets a state: BUY while the fast average is
//! above the slow one, SELL while it is below, HOLD otherwise.

use crate::domain::{Bar, Signal};
use crate::indicators::{Indicator, Sma};

pub const FAST_PERIOD: usize = 10;
pub const SLOW_PERIOD: usize = 50;

/// Classify one bar from its two averages.
///
/// Equal averages, or either average undefined, is `Hold`.
pub fn classify(fast: Option<f64>, slow: Option<f64>) -> Signal {
    match (fast, slow) {
        (Some(f), Some(s)) if f > s => Signal::Buy,
        (Some(f), Some(s)) if f < s => Signal::Sell,
        _ => Signal::Hold,
    }
}

/// Fast/slow SMA pair that annotates bars with `ma10`, `ma50` and `signal`.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: Sma,
    slow: Sma,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        assert!(
            slow_period > fast_period,
            "slow_period must be > fast_period"
        );
        Self {
            fast: Sma::new(fast_period),
            slow: Sma::new(slow_period),
        }
    }

    pub fn default_params() -> Self {
        Self::new(FAST_PERIOD, SLOW_PERIOD)
    }

    /// Fast and slow average series for the given closes.
    pub fn averages(&self, closes: &[f64]) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
        (self.fast.compute(closes), self.slow.compute(closes))
    }

    /// Overwrite the indicator fields of `bars` in place.
    ///
    /// Bars must already be in ascending date order.
    pub fn annotate(&self, bars: &mut [Bar]) {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (fast, slow) = self.averages(&closes);
        for ((bar, f), s) in bars.iter_mut().zip(fast).zip(slow) {
            bar.ma10 = f;
            bar.ma50 = s;
            bar.signal = classify(f, s);
        }
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::default_params()
    }
}
