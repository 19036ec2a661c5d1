//! Held-out error diagnostics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    /// `None` when the inputs are empty or differ in length.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Option<Self> {
        if y_true.is_empty() || y_true.len() != y_pred.len() {
            return None;
        }
        let n = y_true.len() as f64;
        let (sq, abs) = y_true
            .iter()
            .zip(y_pred)
            .fold((0.0, 0.0), |(sq, abs), (t, p)| {
                let e = t - p;
                (sq + e * e, abs + e.abs())
            });
        Some(Self {
            rmse: (sq / n).sqrt(),
            mae: abs / n,
        })
    }
}
