//! Simple Moving Average (SMA).
//!
//! Mean of close prices over a trailing window.
//! Lookback: period - 1 (first defined value at index period-1).
//!
//! Each window is summed on its own with Neumaier compensation, and a window
//! of identical closes yields that close exactly. Two periods over the same
//! flat stretch therefore agree bit for bit.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("ma{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let n = closes.len();
        let mut result = vec![None; n];

        if n < self.period {
            return result;
        }

        for end in self.period..=n {
            result[end - 1] = Some(window_mean(&closes[end - self.period..end]));
        }

        result
    }
}

fn window_mean(window: &[f64]) -> f64 {
    let first = window[0];
    if window.iter().all(|&v| v == first) {
        return first;
    }
    compensated_sum(window) / window.len() as f64
}

/// Neumaier's variant of Kahan summation.
fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut carry = 0.0;
    for &v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            carry += (sum - t) + v;
        } else {
            carry += (v - t) + sum;
        }
        sum = t;
    }
    sum + carry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let result = Sma::new(5).compute(&closes);

        assert_eq!(result.len(), 7);
        for (i, value) in result.iter().enumerate().take(4) {
            assert!(value.is_none(), "expected undefined at index {i}");
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let result = Sma::new(1).compute(&[100.0, 200.0, 300.0]);
        assert_eq!(result, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn sma_is_causal() {
        // Values up to t must not change when later closes are appended.
        let full: Vec<f64> = (0..80).map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let sma = Sma::new(10);
        let on_full = sma.compute(&full);
        let on_prefix = sma.compute(&full[..40]);
        for t in 0..40 {
            assert_eq!(on_prefix[t].is_some(), on_full[t].is_some());
            if let (Some(a), Some(b)) = (on_prefix[t], on_full[t]) {
                assert_approx(a, b, DEFAULT_EPSILON);
            }
        }
    }

    #[test]
    fn flat_fractional_closes_average_to_the_close() {
        let closes = vec![0.1; 60];
        let ma10 = Sma::new(10).compute(&closes);
        let ma50 = Sma::new(50).compute(&closes);
        for t in 49..60 {
            assert_eq!(ma10[t], Some(0.1));
            assert_eq!(ma50[t], Some(0.1));
        }
    }

    #[test]
    fn flat_stretch_after_a_move_is_exact() {
        // The window must forget earlier closes entirely.
        let mut closes = vec![123.456, 7.89, 1e6];
        closes.extend(std::iter::repeat(0.3).take(50));
        let ma10 = Sma::new(10).compute(&closes);
        let ma50 = Sma::new(50).compute(&closes);
        assert_eq!(ma10[52], Some(0.3));
        assert_eq!(ma50[52], Some(0.3));
    }

    #[test]
    fn compensated_sum_keeps_small_terms() {
        assert_eq!(compensated_sum(&[1e16, 1.0, -1e16]), 1.0);
        assert_approx(window_mean(&[0.1, 0.2, 0.3]), 0.2, 1e-15);
    }

    #[test]
    fn sma_lookback_and_name() {
        assert_eq!(Sma::new(50).lookback(), 49);
        assert_eq!(Sma::new(10).name(), "ma10");
    }

    #[test]
    fn sma_too_few_bars() {
        let result = Sma::new(5).compute(&[10.0, 11.0]);
        assert!(result.iter().all(Option::is_none));
    }
}
