pub mod partitions;
pub mod pool;
pub mod registry;
