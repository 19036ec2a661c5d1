//! Ridge-regularized least squares with intercept, backed by smartcore.
//!
//! Features and labels are mean-centred before fitting, so the intercept is
//! never penalized and constant columns stay solvable. λ is `ridge` scaled by
//! the mean diagonal of `XcᵀXc`, so the penalty does not depend on price level.

use super::regressor::{check_training_shape, check_width, ModelError, Regressor};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};
use std::fmt;

pub const DEFAULT_RIDGE: f64 = 1e-6;

type RidgeModel = RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

struct Fitted {
    model: RidgeModel,
    x_mean: Vec<f64>,
    y_mean: f64,
}

pub struct LinearRegressor {
    ridge: f64,
    fitted: Option<Fitted>,
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self::with_ridge(DEFAULT_RIDGE)
    }

    pub fn with_ridge(ridge: f64) -> Self {
        Self {
            ridge,
            fitted: None,
        }
    }

    pub fn ridge(&self) -> f64 {
        self.ridge
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LinearRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearRegressor")
            .field("ridge", &self.ridge)
            .field("trained", &self.is_trained())
            .finish()
    }
}

fn centred(x: &[Vec<f64>], mean: &[f64]) -> Vec<Vec<f64>> {
    x.iter()
        .map(|row| row.iter().zip(mean).map(|(v, m)| v - m).collect())
        .collect()
}

fn to_matrix(rows: &Vec<Vec<f64>>) -> Result<DenseMatrix<f64>, ModelError> {
    DenseMatrix::from_2d_vec(rows)
        .map_err(|e| ModelError::Training(format!("failed to build feature matrix: {e:?}")))
}

impl Regressor for LinearRegressor {
    fn name(&self) -> &str {
        "linear"
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        if !(self.ridge >= 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "ridge must be >= 0, got {}",
                self.ridge
            )));
        }
        let p = check_training_shape(x, y)?;
        // The normal equations need more rows than features.
        if x.len() <= p {
            return Err(ModelError::InsufficientData {
                rows: x.len(),
                required: p + 1,
            });
        }
        let n = x.len() as f64;

        let x_mean: Vec<f64> = (0..p)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n;

        let xc = centred(x, &x_mean);
        let yc: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let trace: f64 = xc.iter().flat_map(|row| row.iter().map(|v| v * v)).sum();
        // Cholesky needs a strictly positive diagonal when a column is constant.
        let alpha = (self.ridge * (trace / p.max(1) as f64).max(1.0)).max(f64::EPSILON);

        let params = RidgeRegressionParameters::default()
            .with_alpha(alpha)
            .with_normalize(false)
            .with_solver(RidgeRegressionSolverName::Cholesky);
        let model = RidgeRegression::fit(&to_matrix(&xc)?, &yc, params)
            .map_err(|e| ModelError::Training(format!("{e:?}")))?;

        self.fitted = Some(Fitted {
            model,
            x_mean,
            y_mean,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotTrained)?;
        check_width(x, fitted.x_mean.len())?;
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let xc = centred(x, &fitted.x_mean);
        let out = fitted
            .model
            .predict(&to_matrix(&xc)?)
            .map_err(|e| ModelError::Training(format!("prediction failed: {e:?}")))?;
        Ok(out.into_iter().map(|v| v + fitted.y_mean).collect())
    }
}
