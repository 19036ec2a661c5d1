//! Business-day dates for forecast output.
//!
//! Weekends are skipped; exchange holidays are not modelled.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The `n` business days strictly after `after`, ascending.
pub fn next_business_days(after: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n);
    let mut date = after;
    while out.len() < n {
        date += Duration::days(1);
        if is_business_day(date) {
            out.push(date);
        }
    }
    out
}
