//! Trailing indicators over close prices.
//!
//! Indicators are pure functions: close history in, one optional value per
//! bar out. A value at index `t` never depends on closes after `t`.

pub mod sma;

pub use sma::Sma;

/// Trait for indicators.
///
/// The output has the same length as the input. The first `lookback()`
/// values are `None` (warmup).
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ma10").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire close series.
    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>>;
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-9;
