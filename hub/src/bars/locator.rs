use chrono::{DateTime, Datelike};

/// Neighbouring partitions visited on each side of a window.
///
/// Partitions are keyed by the ingesting clock's calendar year, so bars near
/// 1 January can sit one partition over from their UTC year.
pub const SPILL_YEARS: i32 = 1;

/// UTC calendar year of a unix-seconds timestamp.
pub fn year_of(ts: i64) -> Option<i32> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.year())
}

/// Scan order for a count-back query: the spill-over year, then `end_year`
/// back through `lookback` years, newest first.
pub fn count_back_years(end_year: i32, lookback: i32) -> Vec<i32> {
    let newest = end_year.saturating_add(SPILL_YEARS);
    let oldest = end_year.saturating_sub(lookback.max(1) - 1);
    (oldest..=newest).rev().collect()
}

/// Scan order for a range query: every year touched by `[from_year, to_year]`
/// plus one spill-over year on each side, newest first.
pub fn range_years(from_year: i32, to_year: i32) -> Vec<i32> {
    if from_year > to_year {
        return Vec::new();
    }
    let newest = to_year.saturating_add(SPILL_YEARS);
    let oldest = from_year.saturating_sub(SPILL_YEARS);
    (oldest..=newest).rev().collect()
}
