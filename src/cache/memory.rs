//! In-Memory Backend Module
//!
//! HashMap storage with lazy TTL expiration and Redis-style key patterns.
//! Used for local runs and tests; supports simulating transport failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::backend::{BatchWrite, CacheBackend};
use crate::cache::{glob_match, CacheEntry, ClusterInfo};
use crate::error::{CacheError, Result};

// == Memory Backend ==
/// In-process key-value store.
#[derive(Debug)]
pub struct MemoryBackend {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    connected: AtomicBool,
    /// When set, every call fails as if the transport were down
    failing: AtomicBool,
    /// Delay before `cluster_info` replies, in milliseconds
    latency_ms: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every `cluster_info` reply, simulating a slow cluster.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of stored entries, expired ones not yet reclaimed included.
    pub async fn stored(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Backend(
                "simulated transport failure".to_string(),
            ));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection closed".to_string()));
        }
        Ok(())
    }

    async fn live_value(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(
                "simulated connection refusal".to_string(),
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.live_value(key).await)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.check()?;
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(key)
                    .filter(|entry| !entry.is_expired())
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.check()?;
        let entry = CacheEntry::new(value.to_string(), Some(ttl));
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_many_ex(&self, batch: &[BatchWrite]) -> Result<()> {
        self.check()?;
        let mut entries = self.entries.write().await;
        for write in batch {
            entries.insert(
                write.key.clone(),
                CacheEntry::new(write.value.clone(), Some(write.ttl)),
            );
        }
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.check()?;
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check()?;
        Ok(self.live_value(key).await.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check()?;
        let mut entries = self.entries.write().await;
        let live = entries.get(key).is_some_and(|entry| !entry.is_expired());
        if !live {
            return Ok(false);
        }

        if ttl.is_zero() {
            entries.remove(key);
        } else if let Some(entry) = entries.get_mut(key) {
            entry.set_ttl(ttl);
        }
        Ok(true)
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>> {
        self.check()?;
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.ttl_remaining().map(|secs| secs as i64).unwrap_or(-1)))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.check()?;
        let entries = self.entries.read().await;
        let mut matched: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        matched.sort();
        Ok(matched)
    }

    async fn cluster_info(&self) -> Result<ClusterInfo> {
        self.check()?;
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        Ok(ClusterInfo::standalone())
    }

    fn expires_lazily(&self) -> bool {
        true
    }

    async fn purge_expired(&self) -> Result<u64> {
        self.check()?;
        Ok(self.cleanup_expired().await as u64)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = MemoryBackend::new();

        backend.set_ex("key1", "value1", Duration::from_secs(60)).await.unwrap();
        let value = backend.get("key1").await.unwrap();

        assert_eq!(value.as_deref(), Some("value1"));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let backend = MemoryBackend::new();

        backend.set_ex("key1", "value1", Duration::from_secs(60)).await.unwrap();
        backend.set_ex("key1", "value2", Duration::from_secs(60)).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap().as_deref(), Some("value2"));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let backend = MemoryBackend::new();

        backend.set_ex("key1", "value1", Duration::from_millis(50)).await.unwrap();
        assert!(backend.exists("key1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(backend.get("key1").await.unwrap(), None);
        assert!(!backend.exists("key1").await.unwrap());
        assert_eq!(backend.ttl("key1").await.unwrap(), None);
        assert_eq!(backend.cleanup_expired().await, 1);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_mget_preserves_order() {
        let backend = MemoryBackend::new();
        backend.set_ex("a", "1", Duration::from_secs(60)).await.unwrap();
        backend.set_ex("c", "3", Duration::from_secs(60)).await.unwrap();

        let values = backend.mget(&keys(&["a", "b", "c"])).await.unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None, Some("3".to_string())]);
    }

    #[tokio::test]
    async fn test_del_counts_existing_only() {
        let backend = MemoryBackend::new();
        backend.set_ex("a", "1", Duration::from_secs(60)).await.unwrap();

        let removed = backend.del(&keys(&["a", "missing"])).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.del(&keys(&["a"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expire() {
        let backend = MemoryBackend::new();
        backend.set_ex("a", "1", Duration::from_secs(5)).await.unwrap();

        assert!(backend.expire("a", Duration::from_secs(500)).await.unwrap());
        assert!(backend.ttl("a").await.unwrap().unwrap() > 495);
        assert!(!backend.expire("missing", Duration::from_secs(5)).await.unwrap());

        assert!(backend.expire("a", Duration::ZERO).await.unwrap());
        assert!(!backend.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_pattern() {
        let backend = MemoryBackend::new();
        for key in ["search:1", "search:2", "product:1"] {
            backend.set_ex(key, "x", Duration::from_secs(60)).await.unwrap();
        }

        let matched = backend.keys("search:*").await.unwrap();
        assert_eq!(matched, keys(&["search:1", "search:2"]));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.set_failing(true);

        assert!(backend.get("x").await.is_err());
        assert!(backend.ping().await.is_err());
        assert!(matches!(backend.connect().await, Err(CacheError::Connection(_))));

        backend.set_failing(false);
        assert!(backend.get("x").await.is_ok());
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let backend = MemoryBackend::new();
        backend.close().await.unwrap();
        assert!(backend.get("x").await.is_err());

        backend.connect().await.unwrap();
        assert!(backend.get("x").await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired_reclaims_storage() {
        let backend = MemoryBackend::new();
        assert!(backend.expires_lazily());
        backend.set_ex("short", "1", Duration::from_millis(30)).await.unwrap();
        backend.set_ex("long", "2", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(backend.len().await, 1);
        assert_eq!(backend.stored().await, 2);

        assert_eq!(backend.purge_expired().await.unwrap(), 1);
        assert_eq!(backend.stored().await, 1);
    }
}
