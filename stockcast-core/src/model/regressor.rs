//! Regression capability the forecaster trains against, and model errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("insufficient data: {rows} complete rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("feature width mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model not trained")]
    NotTrained,

    #[error("training failed: {0}")]
    Training(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A trainable single-output regressor.
///
/// The forecaster is agnostic to the algorithm behind this trait.
pub trait Regressor: Send + Sync {
    fn name(&self) -> &str;

    /// Train on row-major features `x` and labels `y` (same length).
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError>;

    /// One prediction per row of `x`.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    fn predict_one(&self, row: &[f64]) -> Result<f64, ModelError> {
        self.predict(&[row.to_vec()])?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Training("regressor returned no prediction".into()))
    }
}

impl<R: Regressor + ?Sized> Regressor for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        (**self).fit(x, y)
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        (**self).predict(x)
    }
}

/// Shape checks shared by the regressors: non-empty, rectangular, labelled.
/// Returns the feature width.
pub(crate) fn check_training_shape(x: &[Vec<f64>], y: &[f64]) -> Result<usize, ModelError> {
    if x.is_empty() {
        return Err(ModelError::InsufficientData {
            rows: 0,
            required: 1,
        });
    }
    if x.len() != y.len() {
        return Err(ModelError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let width = x[0].len();
    check_width(x, width)?;
    Ok(width)
}

pub(crate) fn check_width(x: &[Vec<f64>], width: usize) -> Result<(), ModelError> {
    match x.iter().find(|row| row.len() != width) {
        Some(row) => Err(ModelError::DimensionMismatch {
            expected: width,
            actual: row.len(),
        }),
        None => Ok(()),
    }
}
