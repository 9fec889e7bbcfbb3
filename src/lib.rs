//! Cluster Cache - cache manager over a Redis cluster
//!
//! Provides cache-aside reads and writes with per-category TTL policy,
//! batch operations, pattern invalidation and background health monitoring.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, CacheOptions, Lifecycle};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_cleanup_task, spawn_monitor_task};
