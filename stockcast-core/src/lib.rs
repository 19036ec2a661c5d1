//! Stockcast Core: daily bar ingestion, incremental sync, and recursive
//! price forecasting.
//!
//! - Domain types (bars, signals, ordered series)
//! - Provider payload normalization with MA10/MA50 crossover annotation
//! - Append-only sync into a bar store (in-memory or Parquet)
//! - Lag/moving-average feature tables
//! - Regressors and the iterative multi-step forecaster

pub mod calendar;
pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod model;
pub mod pipeline;
pub mod signal;
