use std::collections::BTreeSet;

use crate::error::HubError;

use super::locator::{count_back_years, range_years, year_of, SPILL_YEARS};
use super::merge::{merge_all, merge_capped, newest_first};
use super::model::RawBar;
use super::source::{PartitionSource, ReadWindow, StoreError};

/// Up to `max_bars` most recent bars for `symbol` at or before `end_ts`,
/// ascending by timestamp.
///
/// Partitions are scanned newest first. The spill-over year and `end_year`
/// share the caller's anchor; after that, each contributing partition moves
/// the anchor to one second before the oldest bar kept, so the next partition
/// can only add strictly older bars.
pub fn count_back<S: PartitionSource + ?Sized>(
    src: &S,
    symbol: &str,
    end_ts: i64,
    max_bars: usize,
    lookback_years: i32,
) -> Result<Vec<RawBar>, HubError> {
    if max_bars == 0 {
        return Ok(Vec::new());
    }
    let end_year = year_of(end_ts)
        .ok_or_else(|| HubError::BadRequest(format!("timestamp out of range: {end_ts}")))?;
    let Some(available) = available_partitions(src) else {
        return Ok(Vec::new());
    };

    let years = count_back_years(end_year, lookback_years);
    let (head, older) = years.split_at(years.len().min(SPILL_YEARS as usize + 1));

    // The spill-over year and `end_year` are both read against `end_ts`; only
    // the newest `max_bars` of their union decide the next anchor.
    let mut head_batches: Vec<Vec<RawBar>> = Vec::new();
    for &year in head {
        if !available.contains(&year) {
            continue;
        }
        let window = ReadWindow::AtOrBefore {
            end_ts,
            limit: max_bars,
        };
        if let Some(batch) = read_partition(src, year, symbol, window)? {
            if !batch.is_empty() {
                tracing::debug!("  {symbol} {year}: got {} bars", batch.len());
                head_batches.push(batch);
            }
        }
    }
    let newest = newest_first(head_batches, max_bars);

    let mut anchor = end_ts;
    if let Some(oldest) = newest.last() {
        anchor = oldest.ti.saturating_sub(1);
    }
    let mut collected = newest.len();
    let mut batches: Vec<Vec<RawBar>> = vec![newest];

    for &year in older {
        if collected >= max_bars {
            break;
        }
        if !available.contains(&year) {
            continue;
        }

        let window = ReadWindow::AtOrBefore {
            end_ts: anchor,
            limit: max_bars - collected,
        };
        let batch = match read_partition(src, year, symbol, window)? {
            Some(b) if !b.is_empty() => b,
            _ => continue,
        };

        tracing::debug!("  {symbol} {year}: got {} bars", batch.len());
        if let Some(oldest) = batch.last() {
            anchor = oldest.ti.saturating_sub(1);
        }
        collected += batch.len();
        batches.push(batch);
    }

    Ok(merge_capped(batches, max_bars))
}

/// Every bar for `symbol` with `from_ts <= ti <= to_ts`, ascending.
pub fn range<S: PartitionSource + ?Sized>(
    src: &S,
    symbol: &str,
    from_ts: i64,
    to_ts: i64,
) -> Result<Vec<RawBar>, HubError> {
    if from_ts > to_ts {
        return Ok(Vec::new());
    }
    let (Some(from_year), Some(to_year)) = (year_of(from_ts), year_of(to_ts)) else {
        return Err(HubError::BadRequest(format!(
            "timestamp out of range: {from_ts}..{to_ts}"
        )));
    };
    let Some(available) = available_partitions(src) else {
        return Ok(Vec::new());
    };

    let mut batches: Vec<Vec<RawBar>> = Vec::new();
    for year in range_years(from_year, to_year) {
        if !available.contains(&year) {
            continue;
        }
        let window = ReadWindow::Between { from_ts, to_ts };
        if let Some(batch) = read_partition(src, year, symbol, window)? {
            if !batch.is_empty() {
                tracing::debug!("  {symbol} {year}: got {} bars", batch.len());
                batches.push(batch);
            }
        }
    }

    Ok(merge_all(batches))
}

fn available_partitions<S: PartitionSource + ?Sized>(src: &S) -> Option<BTreeSet<i32>> {
    match src.partitions() {
        Ok(years) => Some(years),
        Err(e) => {
            tracing::warn!("Could not list partitions: {e}");
            None
        }
    }
}

/// `Ok(None)` when the partition is skipped; integrity errors propagate.
fn read_partition<S: PartitionSource + ?Sized>(
    src: &S,
    year: i32,
    symbol: &str,
    window: ReadWindow,
) -> Result<Option<Vec<RawBar>>, HubError> {
    match src.read(year, symbol, window) {
        Ok(batch) => Ok(Some(batch)),
        Err(StoreError::Unavailable(msg)) => {
            tracing::warn!("Skipping partition {year}: {msg}");
            Ok(None)
        }
        Err(e @ StoreError::Integrity(_)) => Err(e.into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashSet};

    /// In-memory store: `year -> [(symbol, bar)]`, with per-year failure knobs.
    #[derive(Default)]
    pub(crate) struct MemorySource {
        pub partitions: BTreeMap<i32, Vec<(String, RawBar)>>,
        pub broken: HashSet<i32>,
        pub corrupt: HashSet<i32>,
        pub catalog_down: bool,
        pub reads: RefCell<Vec<(i32, ReadWindow)>>,
    }

    impl MemorySource {
        pub fn insert(&mut self, year: i32, symbol: &str, ti: i64, close: f64) {
            self.partitions.entry(year).or_default().push((
                symbol.to_string(),
                RawBar {
                    ti,
                    o: json!(close),
                    h: json!(close),
                    l: json!(close),
                    c: json!(close),
                    v: json!(10),
                },
            ));
        }
    }

    impl PartitionSource for MemorySource {
        fn partitions(&self) -> Result<BTreeSet<i32>, StoreError> {
            if self.catalog_down {
                return Err(StoreError::Unavailable("catalog down".into()));
            }
            Ok(self.partitions.keys().copied().collect())
        }

        fn read(&self, year: i32, symbol: &str, window: ReadWindow) -> Result<Vec<RawBar>, StoreError> {
            self.reads.borrow_mut().push((year, window));
            if self.broken.contains(&year) {
                return Err(StoreError::Unavailable(format!("{year} timed out")));
            }
            if self.corrupt.contains(&year) {
                return Err(StoreError::Integrity(format!("{year}: ti is not an integer")));
            }
            let rows = self.partitions.get(&year).cloned().unwrap_or_default();
            let mut bars: Vec<RawBar> = rows
                .into_iter()
                .filter(|(s, _)| s == symbol)
                .map(|(_, b)| b)
                .collect();
            match window {
                ReadWindow::AtOrBefore { end_ts, limit } => {
                    bars.retain(|b| b.ti <= end_ts);
                    bars.sort_by(|a, b| b.ti.cmp(&a.ti));
                    bars.truncate(limit);
                }
                ReadWindow::Between { from_ts, to_ts } => {
                    bars.retain(|b| b.ti >= from_ts && b.ti <= to_ts);
                    bars.sort_by_key(|b| b.ti);
                }
            }
            Ok(bars)
        }

        fn distinct_symbols(&self, year: i32) -> Result<Vec<String>, StoreError> {
            if self.broken.contains(&year) {
                return Err(StoreError::Unavailable(format!("{year} timed out")));
            }
            let set: BTreeSet<String> = self
                .partitions
                .get(&year)
                .map(|rows| rows.iter().map(|(s, _)| s.clone()).collect())
                .unwrap_or_default();
            Ok(set.into_iter().collect())
        }
    }

    fn times(bars: &[RawBar]) -> Vec<i64> {
        bars.iter().map(|b| b.ti).collect()
    }

    const DAY: i64 = 86_400;
    // 2023-11-14T22:13:20Z
    const T: i64 = 1_700_000_000;

    #[test]
    fn newest_partition_wins_on_duplicate_timestamp() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 1.0);
        src.insert(2024, "ABC", T, 2.0);

        let bars = count_back(&src, "ABC", T + 10, 1, 20).unwrap();

        assert_eq!(times(&bars), vec![T]);
        assert_eq!(bars[0].c, json!(2.0));
    }

    #[test]
    fn duplicate_appears_once_with_larger_budget() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 1.0);
        src.insert(2023, "ABC", T - DAY, 0.5);
        src.insert(2024, "ABC", T, 2.0);

        let bars = count_back(&src, "ABC", T + 10, 50, 20).unwrap();

        assert_eq!(times(&bars), vec![T - DAY, T]);
        assert_eq!(bars[1].c, json!(2.0));
    }

    #[test]
    fn spill_over_year_does_not_hide_newer_bars_in_end_year() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T + 5, 1.5);
        src.insert(2023, "ABC", T, 1.0);
        src.insert(2023, "ABC", T - 100, 0.5);
        src.insert(2024, "ABC", T, 2.0);

        let bars = count_back(&src, "ABC", T + 10, 2, 20).unwrap();

        assert_eq!(times(&bars), vec![T, T + 5]);
        assert_eq!(bars[0].c, json!(2.0));

        let reads = src.reads.borrow();
        assert_eq!(
            reads[1],
            (2023, ReadWindow::AtOrBefore { end_ts: T + 10, limit: 2 })
        );
    }

    #[test]
    fn older_partitions_anchor_below_the_merged_head() {
        let mut src = MemorySource::default();
        src.insert(2024, "ABC", T - 50, 2.0);
        src.insert(2023, "ABC", T, 1.0);
        src.insert(2022, "ABC", 1_654_041_600, 0.5);

        let bars = count_back(&src, "ABC", T + 10, 10, 20).unwrap();

        assert_eq!(times(&bars), vec![1_654_041_600, T - 50, T]);
        let reads = src.reads.borrow();
        assert_eq!(
            reads[2],
            (
                2022,
                ReadWindow::AtOrBefore {
                    end_ts: T - 51,
                    limit: 8
                }
            )
        );
    }

    #[test]
    fn budget_shrinks_and_anchor_moves_back_across_partitions() {
        let mut src = MemorySource::default();
        for i in 0..3 {
            src.insert(2023, "ABC", T - i * DAY, 3.0);
        }
        for i in 0..5 {
            // 2022-06-01 onward
            src.insert(2022, "ABC", 1_654_041_600 + i * DAY, 2.0);
        }

        let bars = count_back(&src, "ABC", T, 6, 20).unwrap();

        assert_eq!(bars.len(), 6);
        assert!(bars.windows(2).all(|w| w[0].ti < w[1].ti));

        let reads = src.reads.borrow();
        assert_eq!(
            reads[0],
            (2023, ReadWindow::AtOrBefore { end_ts: T, limit: 6 })
        );
        assert_eq!(
            reads[1],
            (
                2022,
                ReadWindow::AtOrBefore {
                    end_ts: T - 2 * DAY - 1,
                    limit: 3
                }
            )
        );
        assert_eq!(reads.len(), 2);
    }

    #[test]
    fn missing_and_broken_partitions_are_skipped() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 3.0);
        src.insert(2021, "ABC", 1_630_000_000, 1.0);
        src.insert(2020, "ABC", 1_600_000_000, 0.5);
        src.broken.insert(2021);

        let bars = count_back(&src, "ABC", T, 100, 20).unwrap();

        assert_eq!(times(&bars), vec![1_600_000_000, T]);
        let scanned: Vec<i32> = src.reads.borrow().iter().map(|(y, _)| *y).collect();
        assert_eq!(scanned, vec![2023, 2021, 2020]);
    }

    #[test]
    fn corrupt_partition_fails_the_request() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 3.0);
        src.corrupt.insert(2023);

        let err = count_back(&src, "ABC", T, 10, 20).unwrap_err();
        assert!(matches!(err, HubError::DataIntegrity(_)));
    }

    #[test]
    fn unknown_symbol_yields_empty() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 3.0);
        assert!(count_back(&src, "ZZZ", T, 10, 20).unwrap().is_empty());
    }

    #[test]
    fn unreachable_catalog_yields_empty() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 3.0);
        src.catalog_down = true;
        assert!(count_back(&src, "ABC", T, 10, 20).unwrap().is_empty());
        assert!(range(&src, "ABC", T - DAY, T).unwrap().is_empty());
    }

    #[test]
    fn lookback_window_bounds_the_scan() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 3.0);
        src.insert(2000, "ABC", 950_000_000, 1.0);

        let bars = count_back(&src, "ABC", T, 10, 20).unwrap();
        assert_eq!(times(&bars), vec![T]);
    }

    #[test]
    fn zero_budget_reads_nothing() {
        let mut src = MemorySource::default();
        src.insert(2023, "ABC", T, 3.0);
        assert!(count_back(&src, "ABC", T, 0, 20).unwrap().is_empty());
        assert!(src.reads.borrow().is_empty());
    }

    #[test]
    fn repeated_count_back_is_identical() {
        let mut src = MemorySource::default();
        for i in 0..40 {
            src.insert(2023, "ABC", T - i * 3600, i as f64);
            src.insert(2024, "ABC", T - i * 7200, -(i as f64));
        }
        let first = count_back(&src, "ABC", T, 25, 20).unwrap();
        let second = count_back(&src, "ABC", T, 25, 20).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 25);
    }

    #[test]
    fn range_spans_year_boundary() {
        let mut src = MemorySource::default();
        // Stored under the previous year's partition by the ingesting clock.
        src.insert(2020, "ABC", 1_609_459_200, 1.0);
        src.insert(2020, "ABC", 1_609_372_800, 0.0);
        src.insert(2021, "ABC", 1_609_462_800, 2.0);
        src.insert(2021, "ABC", 1_609_545_600, 3.0);
        src.insert(2021, "ABC", 1_609_549_200, 4.0);

        let bars = range(&src, "ABC", 1_609_459_200, 1_609_545_600).unwrap();

        assert_eq!(
            times(&bars),
            vec![1_609_459_200, 1_609_462_800, 1_609_545_600]
        );
    }

    #[test]
    fn range_dedups_and_skips_broken_partitions() {
        let mut src = MemorySource::default();
        src.insert(2021, "ABC", 1_609_462_800, 2.0);
        src.insert(2020, "ABC", 1_609_462_800, 9.0);
        src.insert(2022, "ABC", 1_609_466_400, 5.0);
        src.broken.insert(2022);

        let bars = range(&src, "ABC", 1_609_459_200, 1_609_545_600).unwrap();

        assert_eq!(times(&bars), vec![1_609_462_800]);
        assert_eq!(bars[0].c, json!(2.0));
    }

    #[test]
    fn inverted_range_is_empty() {
        let mut src = MemorySource::default();
        src.insert(2021, "ABC", 1_609_462_800, 2.0);
        assert!(range(&src, "ABC", 1_609_545_600, 1_609_459_200).unwrap().is_empty());
    }
}
