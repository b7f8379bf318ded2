//! # Kairos
//!
//! Time-partitioned item indices for STAC catalogs on Elasticsearch and
//! OpenSearch.
//!
//! ## Features
//!
//! - Date-bounded partitions behind renamable aliases
//! - Size-budgeted rollover, decided once per bulk batch
//! - Datetime-aware index selection for searches
//! - Shared alias cache with a TTL
//! - Async API with a blocking facade
//! - In-memory engine for tests and dry runs
pub mod blocking;
pub mod cache;
pub mod config;
pub mod engine;
mod error;
pub mod insertion;
pub mod lifecycle;
pub mod naming;
pub mod partitioner;
pub mod selection;

// Re-exports for the public API
pub use blocking::BlockingPartitioner;
pub use cache::{AliasCache, AliasLoader, AliasMap};
pub use config::PartitionConfig;
pub use engine::{
    AliasAction, BulkAction, BulkResponse, EngineKind, IndexBody, MemoryEngine, SearchEngineAdapter,
    SearchEngineClient,
};
pub use error::{KairosError, Result};
pub use insertion::{DatetimeIndexInserter, IndexInserter, SimpleIndexInserter};
pub use lifecycle::{IndexSizeMonitor, PartitionManager, Rollover};
pub use partitioner::Partitioner;
pub use selection::{DatetimeIndexSelector, DatetimeRange, IndexSelector, UnfilteredIndexSelector};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
