//! Cache Backend Module
//!
//! The key-value store contract the manager drives. Implementations return
//! errors freely; the manager is responsible for turning them into misses.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::ClusterInfo;
use crate::error::Result;

/// One write of a batched `set_many_ex`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWrite {
    pub key: String,
    pub value: String,
    pub ttl: Duration,
}

/// Store expiry is whole seconds and must be positive.
pub fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

// == Cache Backend ==
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Establishes the connection. Called once during initialization.
    async fn connect(&self) -> Result<()>;

    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Multi-get; the result has one slot per requested key.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Writes every entry in one batch. Either all writes are acknowledged
    /// or the whole batch is reported as failed.
    async fn set_many_ex(&self, entries: &[BatchWrite]) -> Result<()>;

    /// Deletes the keys in one batch and returns how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Refreshes the expiry; false when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remaining TTL in seconds, `Some(-1)` without expiry, None when absent.
    async fn ttl(&self, key: &str) -> Result<Option<i64>>;

    /// Every key across the keyspace matching the glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    async fn cluster_info(&self) -> Result<ClusterInfo>;

    /// True when expired entries stay stored until `purge_expired` runs.
    /// Redis expires keys itself.
    fn expires_lazily(&self) -> bool {
        false
    }

    /// Reclaims expired entries and returns how many were dropped.
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }

    /// Drops the connection. Later calls fail until `connect` is called again.
    async fn close(&self) -> Result<()>;
}
