use std::collections::BTreeSet;

use crate::error::HubError;

use super::model::{AssetClass, SymbolEntry};
use super::source::PartitionSource;

/// Distinct symbols across every existing partition in
/// `first_year..=last_year`.
///
/// A year that fails to answer is logged and left out; only a store whose
/// partition list cannot be read fails the whole catalog.
pub fn list_symbols<S: PartitionSource + ?Sized>(
    src: &S,
    first_year: i32,
    last_year: i32,
) -> Result<BTreeSet<String>, HubError> {
    let available = src.partitions()?;
    let mut symbols: BTreeSet<String> = BTreeSet::new();

    for year in first_year..=last_year {
        if !available.contains(&year) {
            continue;
        }
        match src.distinct_symbols(year) {
            Ok(found) => symbols.extend(found),
            Err(e) => {
                tracing::warn!("Could not query symbols for year {year}: {e}");
            }
        }
    }

    Ok(symbols)
}

/// Tag each symbol with its asset class, keeping the sorted order.
pub fn entries(class: AssetClass, symbols: BTreeSet<String>) -> Vec<SymbolEntry> {
    symbols
        .into_iter()
        .map(|symbol| SymbolEntry {
            symbol,
            kind: class.tag(),
        })
        .collect()
}
