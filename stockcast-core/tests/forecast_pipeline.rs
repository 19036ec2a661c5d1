//! Feature building and forecasting, from hand-built series and from an
//! ingested fixture.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::path::PathBuf;
use stockcast_core::config::{ForecastConfig, ModelKind};
use stockcast_core::data::{JsonFileSource, MemoryStore, Normalizer};
use stockcast_core::domain::{Bar, BarSeries, Signal};
use stockcast_core::model::{build_features, forecast, ModelError, DEFAULT_LAGS};
use stockcast_core::pipeline::{forecast_symbol, ingest_symbol, PipelineError};
use stockcast_core::signal::MaCrossover;

fn series_from_closes(closes: &[f64]) -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut bars: Vec<Bar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::raw(base + Duration::days(i as i64), c, c + 1.0, c - 1.0, c, 1_000.0))
        .collect();
    MaCrossover::default_params().annotate(&mut bars);
    BarSeries::new(bars).unwrap()
}

fn ingested_ibm() -> MemoryStore {
    let source = JsonFileSource::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"));
    let store = MemoryStore::new();
    ingest_symbol(&source, &store, &Normalizer::new(), "IBM").unwrap();
    store
}

#[test]
fn linear_closes_turn_buy_once_fast_average_leads() {
    let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
    let series = series_from_closes(&closes);
    let bars = series.bars();

    let ma10: Vec<f64> = bars.iter().filter_map(|b| b.ma10).collect();
    let ma50: Vec<f64> = bars.iter().filter_map(|b| b.ma50).collect();
    assert!(ma10.windows(2).all(|w| w[1] > w[0]));
    assert!(ma50.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(bars[59].signal, Signal::Buy);
    assert_eq!(bars[48].signal, Signal::Hold);
}

#[test]
fn forty_nine_bars_cannot_forecast() {
    let closes: Vec<f64> = (0..49).map(|i| 100.0 + i as f64).collect();
    let table = build_features(&series_from_closes(&closes), DEFAULT_LAGS);
    assert!(table.is_empty());
    assert!(matches!(
        forecast(&table, 10),
        Err(ModelError::InsufficientData { .. })
    ));
}

#[test]
fn forecast_length_matches_horizon() {
    let closes: Vec<f64> = (0..90).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
    let table = build_features(&series_from_closes(&closes), DEFAULT_LAGS);
    for horizon in [1, 10, 20] {
        let values = forecast(&table, horizon).unwrap();
        assert_eq!(values.len(), horizon);
        assert!(values.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn forecast_of_fixture_is_dated_and_reproducible() {
    let store = ingested_ibm();
    let config = ForecastConfig::default();

    let report = forecast_symbol(&store, "IBM", &config).unwrap();
    assert_eq!(report.points.len(), 10);
    assert_eq!(report.last_date, NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
    assert_eq!(report.points[0].date, NaiveDate::from_ymd_opt(2024, 6, 18).unwrap());
    for pair in report.points.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }
    assert!(report
        .points
        .iter()
        .all(|p| !matches!(p.date.weekday(), Weekday::Sat | Weekday::Sun)));

    // 120 bars less the 49-bar warmup; a fifth (rounded up) is held out.
    assert_eq!(report.training.train_rows + report.training.test_rows, 71);
    assert_eq!(report.training.test_rows, 15);
    assert!(report.training.holdout.unwrap().rmse.is_finite());

    let again = forecast_symbol(&store, "IBM", &config).unwrap();
    assert_eq!(report, again);
}

#[test]
fn seed_changes_the_holdout_not_the_shape() {
    let store = ingested_ibm();
    let a = forecast_symbol(&store, "IBM", &ForecastConfig::default()).unwrap();
    let b = forecast_symbol(
        &store,
        "IBM",
        &ForecastConfig {
            seed: 7,
            ..ForecastConfig::default()
        },
    )
    .unwrap();
    assert_eq!(a.points.len(), b.points.len());
    assert_eq!(a.training.test_rows, b.training.test_rows);
}

#[test]
fn linear_model_forecasts_fixture() {
    let store = ingested_ibm();
    let config = ForecastConfig {
        model: ModelKind::Linear,
        ..ForecastConfig::default()
    };
    let report = forecast_symbol(&store, "IBM", &config).unwrap();
    assert_eq!(report.model, "linear");
    assert!(report.points.iter().all(|p| p.close.is_finite() && p.close > 0.0));
}

#[test]
fn unknown_symbol_has_no_history() {
    let store = ingested_ibm();
    assert!(matches!(
        forecast_symbol(&store, "MSFT", &ForecastConfig::default()),
        Err(PipelineError::Model(ModelError::InsufficientData { .. }))
    ));
}
