//! Cache Module
//!
//! Cluster-backed cache manager with per-category TTL policy, batch
//! operations, pattern invalidation and statistics.

pub mod backend;
mod cluster_info;
mod entry;
pub mod keys;
mod lookup;
mod manager;
mod memory;
mod options;
mod pattern;
mod redis_cluster;
mod stats;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::{BatchWrite, CacheBackend};
pub use cluster_info::ClusterInfo;
pub use entry::CacheEntry;
pub use keys::build_key;
pub use lookup::Lookup;
pub use manager::{CacheManager, Lifecycle, Statistics};
pub use memory::MemoryBackend;
pub use options::CacheOptions;
pub use pattern::glob_match;
pub use redis_cluster::RedisClusterBackend;
pub use stats::{CacheStats, StatsSnapshot};
pub use ttl::TtlPolicy;
