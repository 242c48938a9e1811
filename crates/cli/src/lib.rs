//! # Context CLI
//!
//! Library half of the `context` binary: the [`ContextAggregator`] that ties
//! strategies, project analysis and the optimizer together, a TTL cache in
//! front of it, and the TOML configuration file format.

pub mod aggregator;
pub mod cache;
pub mod config;

pub use aggregator::{build_summary, join_tagged, split_tagged, ContextAggregator};
pub use cache::{cache_key, CacheConfig, CachedAggregator};
pub use config::CliConfig;
