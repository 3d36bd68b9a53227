//! Year-partitioned bar queries: locate partitions, read them through a
//! [`source::PartitionSource`], merge the batches, and shape the result for
//! the chart.

pub mod catalog;
pub mod format;
pub mod locator;
pub mod merge;
pub mod model;
pub mod query;
pub mod source;

pub use model::{AssetClass, Bar, RawBar, SymbolEntry};
pub use source::{PartitionSource, ReadWindow, StoreError};
