//! Feature builder: bar series to supervised-learning rows.
//!
//! Each row carries `lag_1..lag_k` (the previous k closes) followed by `ma10`
//! and `ma50`, labelled with that bar's close. Moving averages are recomputed
//! from closes rather than read from the stored bars, so the table is
//! self-consistent even when stored indicators are stale or missing.
//!
//! Rows with any undefined field are dropped. With the default 10 lags that
//! is the first 49 bars (MA50 warmup).

use crate::domain::BarSeries;
use crate::signal::MaCrossover;
use chrono::NaiveDate;

pub const DEFAULT_LAGS: usize = 10;

/// One complete feature vector and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    /// `[lag_1, .., lag_k, ma10, ma50]`
    pub features: Vec<f64>,
    /// Close of this bar.
    pub label: f64,
}

/// Ordered feature rows plus the column layout they share.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    lags: usize,
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn lags(&self) -> usize {
        self.lags
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Feature matrix, one inner vec per row.
    pub fn x(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.features.clone()).collect()
    }

    /// Label vector.
    pub fn y(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.label).collect()
    }
}

/// Column names for `lags` lag features plus the two averages.
pub fn feature_columns(lags: usize) -> Vec<String> {
    (1..=lags)
        .map(|j| format!("lag_{j}"))
        .chain(["ma10".to_string(), "ma50".to_string()])
        .collect()
}

/// Expand `series` into complete feature rows. Pure: identical input gives
/// identical, identically ordered output.
pub fn build_features(series: &BarSeries, lags: usize) -> FeatureTable {
    assert!(lags >= 1, "lags must be >= 1");

    let closes = series.closes();
    let (ma10, ma50) = MaCrossover::default_params().averages(&closes);

    let rows = series
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            let mut features: Vec<f64> = (1..=lags)
                .map(|j| i.checked_sub(j).map(|k| closes[k]))
                .collect::<Option<_>>()?;
            features.push(ma10[i]?);
            features.push(ma50[i]?);
            Some(FeatureRow {
                date: bar.date,
                features,
                label: bar.close,
            })
        })
        .collect();

    FeatureTable {
        lags,
        columns: feature_columns(lags),
        rows,
    }
}

#[cfg(test)]
pub(crate) fn table_from_rows(lags: usize, rows: Vec<FeatureRow>) -> FeatureTable {
    FeatureTable {
        lags,
        columns: feature_columns(lags),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn series_from_closes(closes: &[f64]) -> BarSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        BarSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Bar::raw(base + chrono::Duration::days(i as i64), c, c, c, c, 1.0))
                .collect(),
        )
        .unwrap()
    }

    fn linear(n: usize) -> BarSeries {
        series_from_closes(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    #[test]
    fn drops_first_49_rows() {
        let table = build_features(&linear(60), DEFAULT_LAGS);
        assert_eq!(table.len(), 11);
        assert_eq!(table.rows()[0].label, 149.0);
    }

    #[test]
    fn exactly_49_bars_is_empty() {
        assert!(build_features(&linear(49), DEFAULT_LAGS).is_empty());
        assert_eq!(build_features(&linear(50), DEFAULT_LAGS).len(), 1);
    }

    #[test]
    fn column_layout() {
        let table = build_features(&linear(60), 3);
        assert_eq!(table.columns(), &["lag_1", "lag_2", "lag_3", "ma10", "ma50"]);
        assert_eq!(table.width(), 5);
        assert!(table.rows().iter().all(|r| r.features.len() == 5));
    }

    #[test]
    fn lag_values_are_previous_closes() {
        let table = build_features(&linear(60), DEFAULT_LAGS);
        let row = &table.rows()[0]; // bar index 49, close 149
        for j in 1..=10 {
            assert_eq!(row.features[j - 1], 149.0 - j as f64);
        }
        // ma10 over closes 140..=149, ma50 over 100..=149
        assert_approx(row.features[10], 144.5, DEFAULT_EPSILON);
        assert_approx(row.features[11], 124.5, DEFAULT_EPSILON);
    }

    #[test]
    fn long_lag_window_dominates_warmup() {
        // 60 lags need 60 prior closes, so the first defined row is index 60.
        let table = build_features(&linear(70), 60);
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn ignores_stale_stored_averages() {
        let mut bars = linear(60).into_bars();
        for bar in &mut bars {
            bar.ma10 = Some(-1.0);
            bar.ma50 = None;
        }
        let stale = BarSeries::new(bars).unwrap();
        assert_eq!(
            build_features(&stale, DEFAULT_LAGS),
            build_features(&linear(60), DEFAULT_LAGS)
        );
    }

    #[test]
    fn x_and_y_align_with_rows() {
        let table = build_features(&linear(55), DEFAULT_LAGS);
        assert_eq!(table.x().len(), table.y().len());
        assert_eq!(table.y(), vec![149.0, 150.0, 151.0, 152.0, 153.0, 154.0]);
    }
}
