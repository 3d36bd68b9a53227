use serde::Serialize;
use serde_json::Value;

/// A stored record as it comes out of a partition, before coercion.
///
/// Price and volume fields keep whatever type the store holds so that the
/// formatter can tell a missing volume apart from a corrupt price.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub ti: i64,
    pub o: Value,
    pub h: Value,
    pub l: Value,
    pub c: Value,
    pub v: Value,
}

/// Chart-ready bar. `time` is unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// The two datasets the hub serves. Each lives in its own store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Stocks,
    Options,
}

impl AssetClass {
    /// Tag attached to every symbol catalog entry.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Stocks => "stock",
            Self::Options => "option",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolEntry {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}
