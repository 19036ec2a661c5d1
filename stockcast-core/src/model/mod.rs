//! Forecasting: feature construction, regressors, recursive projection.

pub mod boosted;
pub mod features;
pub mod forecast;
pub mod linear;
pub mod metrics;
pub mod regressor;
pub mod split;

pub use boosted::{BoostedParams, GradientBoostedTrees};
pub use features::{build_features, feature_columns, FeatureRow, FeatureTable, DEFAULT_LAGS};
pub use forecast::{forecast, next_feature_vector, Forecast, ForecastSettings, Forecaster, TrainingReport, DEFAULT_HORIZON};
pub use linear::LinearRegressor;
pub use metrics::RegressionMetrics;
pub use regressor::{ModelError, Regressor};
pub use split::{train_test_split, TrainTestSplit};
