//! Criterion benchmarks for the ingestion and forecasting hot paths.
//!
//! 1. Normalization of a full-size provider payload
//! 2. Feature table construction
//! 3. Boosted-tree training plus a 10-step forecast
//! 4. Recursive projection alone

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stockcast_core::data::{DailyPayload, Normalizer, RawQuote, RawSeries};
use stockcast_core::domain::{Bar, BarSeries};
use stockcast_core::model::{
    build_features, ForecastSettings, Forecaster, GradientBoostedTrees, DEFAULT_LAGS,
};
use stockcast_core::signal::MaCrossover;

// ── Helpers ──────────────────────────────────────────────────────────

fn close_at(i: usize) -> f64 {
    100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.05
}

fn make_payload(n: usize) -> DailyPayload {
    let base = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    let series: RawSeries = (0..n)
        .map(|i| {
            let c = format!("{:.4}", close_at(i));
            (
                (base + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                RawQuote::new(&c, &c, &c, &c, "1000000"),
            )
        })
        .collect();
    DailyPayload::from_series(series)
}

fn make_series(n: usize) -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    let mut bars: Vec<Bar> = (0..n)
        .map(|i| {
            let c = close_at(i);
            Bar::raw(base + Duration::days(i as i64), c - 0.3, c + 1.5, c - 1.5, c, 1e6)
        })
        .collect();
    MaCrossover::default_params().annotate(&mut bars);
    BarSeries::new(bars).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let payload = make_payload(5_000);
    let unlimited = Normalizer::with_history_limit(usize::MAX);
    let default = Normalizer::new();

    let mut group = c.benchmark_group("normalize");
    group.bench_function("full_history_5000", |b| {
        b.iter(|| unlimited.normalize(black_box(&payload)))
    });
    group.bench_function("last_251_of_5000", |b| {
        b.iter(|| default.normalize(black_box(&payload)))
    });
    group.finish();
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_features");
    for n in [251, 2_500] {
        let series = make_series(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &series, |b, s| {
            b.iter(|| build_features(black_box(s), DEFAULT_LAGS))
        });
    }
    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let table = build_features(&make_series(251), DEFAULT_LAGS);

    c.bench_function("train_and_forecast_251", |b| {
        b.iter(|| {
            let mut forecaster = Forecaster::new(GradientBoostedTrees::new(), ForecastSettings::default());
            forecaster.forecast(black_box(&table), 10).unwrap()
        })
    });

    let mut trained = Forecaster::new(GradientBoostedTrees::new(), ForecastSettings::default());
    trained.train(&table).unwrap();
    let last = table.last().unwrap().features.clone();
    c.bench_function("project_10_steps", |b| {
        b.iter(|| trained.project(black_box(&last), DEFAULT_LAGS, 10).unwrap())
    });
}

criterion_group!(benches, bench_normalize, bench_features, bench_forecast);
criterion_main!(benches);
