use std::collections::BTreeSet;

use crate::error::HubError;

use super::model::RawBar;

/// Time predicate for a single partition read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadWindow {
    /// `ti <= end_ts`, newest first, at most `limit` rows.
    AtOrBefore { end_ts: i64, limit: usize },
    /// `from_ts <= ti <= to_ts`, oldest first, unlimited.
    Between { from_ts: i64, to_ts: i64 },
}

/// Failure reading one partition.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Missing table or failed query. Callers skip the partition.
    Unavailable(String),
    /// A row holds a value of the wrong type. Never skipped.
    Integrity(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "partition unavailable: {msg}"),
            Self::Integrity(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for HubError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => Self::Db(msg),
            StoreError::Integrity(msg) => Self::DataIntegrity(msg),
        }
    }
}

/// A store holding one partition per calendar year for a single asset class.
pub trait PartitionSource {
    /// Years that currently have a partition.
    fn partitions(&self) -> Result<BTreeSet<i32>, StoreError>;

    /// Bars for `symbol` in partition `year` matching `window`, projected to
    /// the bar fields and ordered as the window prescribes.
    fn read(&self, year: i32, symbol: &str, window: ReadWindow) -> Result<Vec<RawBar>, StoreError>;

    /// Distinct symbols stored in partition `year`.
    fn distinct_symbols(&self, year: i32) -> Result<Vec<String>, StoreError>;
}
