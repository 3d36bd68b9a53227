use std::collections::HashSet;

use super::model::RawBar;

/// Merge per-partition batches given in scan order.
///
/// Duplicate timestamps keep the first occurrence in scan order, at most
/// `cap` bars survive, and the result is ascending by `ti`.
pub fn merge_capped(batches: Vec<Vec<RawBar>>, cap: usize) -> Vec<RawBar> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut unique: Vec<RawBar> = Vec::new();

    for bar in batches.into_iter().flatten() {
        if unique.len() >= cap {
            break;
        }
        if seen.insert(bar.ti) {
            unique.push(bar);
        }
    }

    unique.sort_by_key(|b| b.ti);
    unique
}

/// Union of batches read against one shared anchor, newest first.
///
/// Earlier batches win ties on `ti`; at most `cap` bars are kept.
pub fn newest_first(batches: Vec<Vec<RawBar>>, cap: usize) -> Vec<RawBar> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut unique: Vec<RawBar> = batches
        .into_iter()
        .flatten()
        .filter(|b| seen.insert(b.ti))
        .collect();

    unique.sort_by(|a, b| b.ti.cmp(&a.ti));
    unique.truncate(cap);
    unique
}

/// Uncapped merge for range queries.
pub fn merge_all(batches: Vec<Vec<RawBar>>) -> Vec<RawBar> {
    merge_capped(batches, usize::MAX)
}
