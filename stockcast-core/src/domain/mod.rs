//! Domain types: bars, signals and ordered bar series.

pub mod bar;
pub mod series;

pub use bar::{Bar, Signal, UnknownSignal};
pub use series::{BarSeries, SeriesError};
