//! Training and recursive multi-step forecasting.
//!
//! Projection starts from the last table row's feature vector. Each step's
//! prediction becomes `lag_1` of the next vector, the oldest lag falls off,
//! and the moving-average columns are carried forward unchanged. They are
//! not recomputed from the synthetic trajectory, so error grows with the
//! horizon.

use super::boosted::GradientBoostedTrees;
use super::features::FeatureTable;
use super::metrics::RegressionMetrics;
use super::regressor::{ModelError, Regressor};
use super::split::train_test_split;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_HORIZON: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub horizon: usize,
    /// Share of rows held out for the error diagnostic.
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Diagnostic only; a poor score does not fail training.
    pub holdout: Option<RegressionMetrics>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Predicted closes in chronological order.
    pub values: Vec<f64>,
    pub training: TrainingReport,
}

/// Next input vector: `pred` becomes `lag_1`, lags shift by one, the
/// oldest lag is dropped, trailing columns are copied as-is.
pub fn next_feature_vector(current: &[f64], lags: usize, pred: f64) -> Vec<f64> {
    let mut next = Vec::with_capacity(current.len());
    next.push(pred);
    next.extend_from_slice(&current[..lags - 1]);
    next.extend_from_slice(&current[lags..]);
    next
}

pub struct Forecaster<R: Regressor> {
    model: R,
    settings: ForecastSettings,
}

impl<R: Regressor> Forecaster<R> {
    pub fn new(model: R, settings: ForecastSettings) -> Self {
        Self { model, settings }
    }

    pub fn model(&self) -> &R {
        &self.model
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Fit on the seeded train partition and score the held-out rows.
    pub fn train(&mut self, table: &FeatureTable) -> Result<TrainingReport, ModelError> {
        let split = train_test_split(table.len(), self.settings.test_fraction, self.settings.seed)?;
        let rows = table.rows();

        let x_train: Vec<Vec<f64>> = split.train.iter().map(|&i| rows[i].features.clone()).collect();
        let y_train: Vec<f64> = split.train.iter().map(|&i| rows[i].label).collect();
        self.model.fit(&x_train, &y_train)?;

        let x_test: Vec<Vec<f64>> = split.test.iter().map(|&i| rows[i].features.clone()).collect();
        let y_test: Vec<f64> = split.test.iter().map(|&i| rows[i].label).collect();
        let holdout = RegressionMetrics::compute(&y_test, &self.model.predict(&x_test)?);

        if let Some(m) = &holdout {
            info!(
                model = self.model.name(),
                train_rows = x_train.len(),
                test_rows = x_test.len(),
                rmse = m.rmse,
                "model trained"
            );
        }

        Ok(TrainingReport {
            train_rows: x_train.len(),
            test_rows: x_test.len(),
            holdout,
        })
    }

    /// Recursively predict `horizon` closes from `last_features`.
    pub fn project(&self, last_features: &[f64], lags: usize, horizon: usize) -> Result<Vec<f64>, ModelError> {
        if lags == 0 || lags > last_features.len() {
            return Err(ModelError::DimensionMismatch {
                expected: lags,
                actual: last_features.len(),
            });
        }

        let mut current = last_features.to_vec();
        let mut out = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            let pred = self.model.predict_one(&current)?;
            debug!(step, pred, "forecast step");
            out.push(pred);
            current = next_feature_vector(&current, lags, pred);
        }
        Ok(out)
    }

    /// Train on `table`, then project `horizon` closes past its last row.
    pub fn forecast(&mut self, table: &FeatureTable, horizon: usize) -> Result<Forecast, ModelError> {
        let last = table.last().ok_or(ModelError::InsufficientData {
            rows: 0,
            required: 2,
        })?;
        let training = self.train(table)?;
        let values = self.project(&last.features, table.lags(), horizon)?;
        Ok(Forecast { values, training })
    }
}

/// Forecast with the default boosted model and default split settings.
pub fn forecast(table: &FeatureTable, horizon: usize) -> Result<Vec<f64>, ModelError> {
    let mut forecaster = Forecaster::new(GradientBoostedTrees::new(), ForecastSettings::default());
    Ok(forecaster.forecast(table, horizon)?.values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::features::{table_from_rows, FeatureRow};
    use crate::model::linear::LinearRegressor;
    use chrono::NaiveDate;

    /// Records every input it is asked to predict and echoes `lag_1 + 1`.
    #[derive(Default)]
    struct Echo {
        seen: std::sync::Mutex<Vec<Vec<f64>>>,
    }

    impl Regressor for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<(), ModelError> {
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.extend(x.iter().cloned());
            }
            Ok(x.iter().map(|row| row[0] + 1.0).collect())
        }
    }

    fn rows(n: usize, lags: usize) -> Vec<FeatureRow> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                let mut features: Vec<f64> = (1..=lags).map(|j| close - j as f64).collect();
                features.extend([close - 5.0, close - 20.0]);
                FeatureRow {
                    date: base + chrono::Duration::days(i as i64),
                    features,
                    label: close,
                }
            })
            .collect()
    }

    #[test]
    fn shift_inserts_prediction_and_keeps_averages() {
        let next = next_feature_vector(&[3.0, 2.0, 1.0, 50.0, 40.0], 3, 9.0);
        assert_eq!(next, vec![9.0, 3.0, 2.0, 50.0, 40.0]);
    }

    #[test]
    fn projection_feeds_predictions_back() {
        let forecaster = Forecaster::new(Echo::default(), ForecastSettings::default());
        let values = forecaster
            .project(&[3.0, 2.0, 1.0, 50.0, 40.0], 3, 4)
            .unwrap();
        assert_eq!(values, vec![4.0, 5.0, 6.0, 7.0]);

        let seen = forecaster.model().seen.lock().unwrap().clone();
        assert_eq!(seen[1], vec![4.0, 3.0, 2.0, 50.0, 40.0]);
        assert_eq!(seen[3], vec![6.0, 5.0, 4.0, 50.0, 40.0]);
        // Averages never move during projection.
        assert!(seen.iter().all(|v| v[3] == 50.0 && v[4] == 40.0));
    }

    #[test]
    fn returns_exactly_horizon_values() {
        let table = table_from_rows(10, rows(30, 10));
        for horizon in [1, 5, 10, 25] {
            assert_eq!(forecast(&table, horizon).unwrap().len(), horizon);
        }
    }

    #[test]
    fn deterministic_for_same_seed_and_input() {
        let table = table_from_rows(10, rows(40, 10));
        assert_eq!(forecast(&table, 10).unwrap(), forecast(&table, 10).unwrap());
    }

    #[test]
    fn empty_table_is_insufficient() {
        let table = table_from_rows(10, Vec::new());
        assert!(matches!(
            forecast(&table, 10),
            Err(ModelError::InsufficientData { .. })
        ));
    }

    #[test]
    fn single_row_is_insufficient() {
        let table = table_from_rows(10, rows(1, 10));
        assert!(matches!(
            forecast(&table, 10),
            Err(ModelError::InsufficientData { rows: 1, .. })
        ));
    }

    #[test]
    fn training_reports_holdout_error() {
        let table = table_from_rows(10, rows(50, 10));
        let mut forecaster = Forecaster::new(LinearRegressor::new(), ForecastSettings::default());
        let report = forecaster.train(&table).unwrap();
        assert_eq!(report.test_rows, 10);
        assert_eq!(report.train_rows, 40);
        // Labels are an exact linear function of lag_1.
        assert!(report.holdout.unwrap().rmse < 1e-4);
    }

    #[test]
    fn linear_model_continues_a_trend() {
        let table = table_from_rows(10, rows(50, 10));
        let mut forecaster = Forecaster::new(LinearRegressor::new(), ForecastSettings::default());
        let out = forecaster.forecast(&table, 3).unwrap();
        // Starts from the last row (close 149), so step one re-predicts it.
        assert!((out.values[0] - 149.0).abs() < 1e-3);
        // Every column is the close minus a constant, so the fitted weights are
        // equal. Step two moves the ten lags up by one but not the averages.
        assert!((out.values[1] - (149.0 + 10.0 / 12.0)).abs() < 1e-3);
    }
}
