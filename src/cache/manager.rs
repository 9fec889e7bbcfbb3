//! Cache Manager Module
//!
//! Best-effort cache-aside layer over a clustered key-value store. Every
//! operation except `initialize` swallows failures: the caller sees a miss
//! or `false`, and the failure is visible only in the error counter and logs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::backend::{BatchWrite, CacheBackend};
use crate::cache::keys::{self, build_key, escape_glob, search_key};
use crate::cache::{
    CacheOptions, CacheStats, ClusterInfo, Lookup, MemoryBackend, RedisClusterBackend,
    StatsSnapshot, TtlPolicy,
};
use crate::config::{BackendKind, Config};
use crate::error::{CacheError, Result};
use crate::tasks::{
    spawn_cleanup_task, spawn_monitor_task, MonitorContext, MonitorHandle, MonitorSettings,
};

// == Lifecycle ==
/// Manager lifecycle. Transport errors never change it; only
/// `initialize` and `shutdown` do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    Connecting,
    Ready,
    ShuttingDown,
    Disconnected,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Connecting => "connecting",
            Lifecycle::Ready => "ready",
            Lifecycle::ShuttingDown => "shutting_down",
            Lifecycle::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

// == Statistics ==
/// Counters plus the latest cluster snapshot, as returned by `get_statistics`.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    pub cluster: Option<ClusterInfo>,
}

// == Cache Manager ==
pub struct CacheManager {
    backend: Arc<dyn CacheBackend>,
    stats: Arc<CacheStats>,
    ttl: TtlPolicy,
    monitor: MonitorSettings,
    cleanup_interval: Duration,
    /// Send commands while not ready instead of failing them
    offline_queue: bool,
    state: RwLock<Lifecycle>,
    /// Replaced wholesale by every monitoring tick
    cluster: Arc<RwLock<Option<ClusterInfo>>>,
    monitor_handle: Mutex<Option<MonitorHandle>>,
    cleanup_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CacheManager {
    // == Constructor ==
    /// Creates an uninitialized manager over the given backend and stats collector.
    pub fn new(backend: Arc<dyn CacheBackend>, stats: Arc<CacheStats>, config: &Config) -> Self {
        Self {
            backend,
            stats,
            ttl: config.ttl.clone(),
            monitor: MonitorSettings::from_config(config),
            cleanup_interval: config.cleanup_period(),
            offline_queue: config.offline_queue,
            state: RwLock::new(Lifecycle::Uninitialized),
            cluster: Arc::new(RwLock::new(None)),
            monitor_handle: Mutex::new(None),
            cleanup_handle: Mutex::new(None),
        }
    }

    /// Creates an uninitialized manager with the backend the config selects.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            BackendKind::Cluster => Arc::new(RedisClusterBackend::new(config)?),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        Ok(Self::new(backend, Arc::new(CacheStats::new()), config))
    }

    /// Builds and initializes a manager in one step.
    pub async fn connect(config: &Config) -> Result<Self> {
        let manager = Self::from_config(config)?;
        manager.initialize().await?;
        Ok(manager)
    }

    // == Initialize ==
    /// Connects, probes liveness and starts the monitoring loop.
    ///
    /// Failure here is fatal and is the only error the manager propagates.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == Lifecycle::Ready {
                return Ok(());
            }
            *state = Lifecycle::Connecting;
        }
        info!("Connecting to cache backend ({})", self.backend.name());

        let probe = async {
            self.backend.connect().await?;
            info!("Cache backend connected");
            self.backend.ping().await
        };
        if let Err(e) = probe.await {
            error!("Cache initialization failed: {}", e);
            *self.state.write().await = Lifecycle::Disconnected;
            return Err(match e {
                CacheError::Connection(msg) => CacheError::Connection(msg),
                other => CacheError::Connection(other.to_string()),
            });
        }

        *self.state.write().await = Lifecycle::Ready;
        info!("Cache backend ready");

        let handle = spawn_monitor_task(self.monitor_context(), &self.monitor);
        if let Some(previous) = self.monitor_handle.lock().await.replace(handle) {
            previous.abort();
        }

        if self.backend.expires_lazily() {
            let handle = spawn_cleanup_task(self.backend.clone(), self.cleanup_interval);
            if let Some(previous) = self.cleanup_handle.lock().await.replace(handle) {
                previous.abort();
            }
        }
        Ok(())
    }

    /// Everything the monitoring loop needs, sharing this manager's handles.
    pub fn monitor_context(&self) -> MonitorContext {
        MonitorContext {
            backend: self.backend.clone(),
            stats: self.stats.clone(),
            cluster: self.cluster.clone(),
            log_path: self.monitor.log_path.clone(),
        }
    }

    pub async fn state(&self) -> Lifecycle {
        *self.state.read().await
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        self.stats.clone()
    }

    async fn ensure_ready(&self) -> Result<()> {
        if self.offline_queue {
            return Ok(());
        }
        match self.state().await {
            Lifecycle::Ready => Ok(()),
            other => Err(CacheError::NotReady(other.to_string())),
        }
    }

    fn record_failure(&self, operation: &str, target: &str, err: &CacheError) {
        self.stats.record_error();
        error!("Cache {} error for {}: {}", operation, target, err);
    }

    // == Lookup ==
    /// Reads a key and reports whether it was a hit, a miss or a failure.
    pub async fn lookup(&self, key: &str, options: &CacheOptions) -> Lookup<Value> {
        let full_key = build_key(key, &options.prefix);
        let result: Result<Option<Value>> = async {
            self.ensure_ready().await?;
            let raw = self.backend.get(&full_key).await?;
            raw.map(|raw| decode(&raw, options.json)).transpose()
        }
        .await;

        match result {
            Ok(Some(value)) => {
                self.stats.record_hit();
                Lookup::Hit(value)
            }
            Ok(None) => {
                self.stats.record_miss();
                debug!("Cache miss: {}", full_key);
                Lookup::Miss
            }
            Err(e) => {
                self.record_failure("get", &full_key, &e);
                Lookup::Error(e)
            }
        }
    }

    // == Get ==
    /// Returns the stored value, or None when absent or on failure.
    pub async fn get(&self, key: &str, options: &CacheOptions) -> Option<Value> {
        self.lookup(key, options).await.into_option()
    }

    /// `get` decoded into a concrete type. A value of the wrong shape reads as absent.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Option<T> {
        let value = self.get(key, options).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Cached value for {}{} has unexpected shape: {}", options.prefix, key, e);
                None
            }
        }
    }

    // == Set ==
    /// Writes a value with the override TTL or the category default.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &CacheOptions,
    ) -> bool {
        let full_key = build_key(key, &options.prefix);
        let ttl = self.ttl.resolve(&full_key, options.ttl);
        let result: Result<()> = async {
            self.ensure_ready().await?;
            let encoded = encode(value, options.json)?;
            self.backend.set_ex(&full_key, &encoded, ttl).await
        }
        .await;

        match result {
            Ok(()) => {
                self.stats.record_sets(1);
                debug!("Cache set: {} (ttl {}s)", full_key, ttl.as_secs());
                true
            }
            Err(e) => {
                self.record_failure("set", &full_key, &e);
                false
            }
        }
    }

    // == Delete ==
    /// Deletes a key; true when something was removed.
    pub async fn del(&self, key: &str, options: &CacheOptions) -> bool {
        let full_key = build_key(key, &options.prefix);
        match self.delete_keys(vec![full_key.clone()]).await {
            Ok(removed) => removed > 0,
            Err(e) => {
                self.record_failure("del", &full_key, &e);
                false
            }
        }
    }

    async fn delete_keys(&self, keys: Vec<String>) -> Result<u64> {
        self.ensure_ready().await?;
        let removed = self.backend.del(&keys).await?;
        self.stats.record_deletes(removed);
        Ok(removed)
    }

    // == Exists ==
    pub async fn exists(&self, key: &str, options: &CacheOptions) -> bool {
        let full_key = build_key(key, &options.prefix);
        let result: Result<bool> = async {
            self.ensure_ready().await?;
            self.backend.exists(&full_key).await
        }
        .await;

        result.unwrap_or_else(|e| {
            self.record_failure("exists", &full_key, &e);
            false
        })
    }

    // == Expire ==
    /// Refreshes a key's TTL; false when absent or on failure.
    pub async fn expire(&self, key: &str, ttl: Duration, options: &CacheOptions) -> bool {
        let full_key = build_key(key, &options.prefix);
        let result: Result<bool> = async {
            self.ensure_ready().await?;
            self.backend.expire(&full_key, ttl).await
        }
        .await;

        result.unwrap_or_else(|e| {
            self.record_failure("expire", &full_key, &e);
            false
        })
    }

    // == TTL ==
    /// Remaining TTL in seconds; None when absent or on failure.
    pub async fn ttl(&self, key: &str, options: &CacheOptions) -> Option<i64> {
        let full_key = build_key(key, &options.prefix);
        let result: Result<Option<i64>> = async {
            self.ensure_ready().await?;
            self.backend.ttl(&full_key).await
        }
        .await;

        result.unwrap_or_else(|e| {
            self.record_failure("ttl", &full_key, &e);
            None
        })
    }

    // == Multi Get ==
    /// Reads many keys in one round trip. Hits and misses are counted per key.
    pub async fn mget<K: AsRef<str>>(&self, keys: &[K], options: &CacheOptions) -> Vec<Option<Value>> {
        if keys.is_empty() {
            return Vec::new();
        }
        let full_keys: Vec<String> = keys
            .iter()
            .map(|key| build_key(key.as_ref(), &options.prefix))
            .collect();

        let result: Result<Vec<Option<String>>> = async {
            self.ensure_ready().await?;
            self.backend.mget(&full_keys).await
        }
        .await;

        let raw_values = match result {
            Ok(values) => values,
            Err(e) => {
                self.record_failure("mget", &format!("{} keys", full_keys.len()), &e);
                return vec![None; full_keys.len()];
            }
        };

        full_keys
            .iter()
            .zip(raw_values)
            .map(|(full_key, raw)| match raw {
                None => {
                    self.stats.record_miss();
                    None
                }
                Some(raw) => match decode(&raw, options.json) {
                    Ok(value) => {
                        self.stats.record_hit();
                        Some(value)
                    }
                    Err(e) => {
                        self.record_failure("mget", full_key, &e);
                        None
                    }
                },
            })
            .collect()
    }

    // == Multi Set ==
    /// Writes every entry in one batch. The sets counter moves by the entry
    /// count on success and not at all on failure.
    pub async fn mset<K: AsRef<str>, V: Serialize>(
        &self,
        entries: &[(K, V)],
        options: &CacheOptions,
    ) -> bool {
        if entries.is_empty() {
            return true;
        }

        let result: Result<()> = async {
            self.ensure_ready().await?;
            let batch = entries
                .iter()
                .map(|(key, value)| {
                    let full_key = build_key(key.as_ref(), &options.prefix);
                    Ok(BatchWrite {
                        ttl: self.ttl.resolve(&full_key, options.ttl),
                        value: encode(value, options.json)?,
                        key: full_key,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            self.backend.set_many_ex(&batch).await
        }
        .await;

        match result {
            Ok(()) => {
                self.stats.record_sets(entries.len() as u64);
                debug!("Cache mset: {} entries", entries.len());
                true
            }
            Err(e) => {
                self.record_failure("mset", &format!("{} entries", entries.len()), &e);
                false
            }
        }
    }

    // == Flush Pattern ==
    /// Deletes every key matching a glob pattern and returns the count.
    ///
    /// Enumerates the whole keyspace on every master; meant for rare,
    /// administrative invalidation rather than hot paths.
    pub async fn flush_pattern(&self, pattern: &str) -> u64 {
        let result: Result<u64> = async {
            self.ensure_ready().await?;
            let matched = self.backend.keys(pattern).await?;
            if matched.is_empty() {
                return Ok(0);
            }
            self.delete_keys(matched).await
        }
        .await;

        match result {
            Ok(removed) => {
                info!("Flushed {} keys matching {}", removed, pattern);
                removed
            }
            Err(e) => {
                self.record_failure("flush", pattern, &e);
                0
            }
        }
    }

    // == Product Accessors ==
    pub async fn cache_product<T: Serialize + ?Sized>(&self, product_id: &str, product: &T) -> bool {
        self.set(product_id, product, &CacheOptions::prefixed(keys::PRODUCT))
            .await
    }

    pub async fn get_product(&self, product_id: &str) -> Option<Value> {
        self.get(product_id, &CacheOptions::prefixed(keys::PRODUCT))
            .await
    }

    // == Price Accessors ==
    pub async fn cache_price<T: Serialize + ?Sized>(&self, product_id: &str, price: &T) -> bool {
        self.set(product_id, price, &CacheOptions::prefixed(keys::PRICE))
            .await
    }

    pub async fn get_price(&self, product_id: &str) -> Option<Value> {
        self.get(product_id, &CacheOptions::prefixed(keys::PRICE)).await
    }

    // == Search Accessors ==
    /// Caches results under a hash of the query string.
    pub async fn cache_search_results<T: Serialize + ?Sized>(&self, query: &str, results: &T) -> bool {
        self.set(
            &search_key(query),
            results,
            &CacheOptions::prefixed(keys::SEARCH),
        )
        .await
    }

    pub async fn get_search_results(&self, query: &str) -> Option<Value> {
        self.get(&search_key(query), &CacheOptions::prefixed(keys::SEARCH))
            .await
    }

    // == Recommendation Accessors ==
    pub async fn cache_recommendations<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        recommendations: &T,
    ) -> bool {
        self.set(
            user_id,
            recommendations,
            &CacheOptions::prefixed(keys::RECOMMENDATION),
        )
        .await
    }

    pub async fn get_recommendations(&self, user_id: &str) -> Option<Value> {
        self.get(user_id, &CacheOptions::prefixed(keys::RECOMMENDATION))
            .await
    }

    // == Session Accessors ==
    pub async fn cache_session<T: Serialize + ?Sized>(&self, session_id: &str, session: &T) -> bool {
        self.set(session_id, session, &CacheOptions::prefixed(keys::SESSION))
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> Option<Value> {
        self.get(session_id, &CacheOptions::prefixed(keys::SESSION))
            .await
    }

    // == User Profile Accessors ==
    pub async fn cache_user<T: Serialize + ?Sized>(&self, user_id: &str, profile: &T) -> bool {
        self.set(user_id, profile, &CacheOptions::prefixed(keys::USER))
            .await
    }

    pub async fn get_user(&self, user_id: &str) -> Option<Value> {
        self.get(user_id, &CacheOptions::prefixed(keys::USER)).await
    }

    // == Invalidate Product ==
    /// Removes a product, its price and every cached search page.
    ///
    /// Search pages are not indexed by the products they contain, so all of
    /// them go. Safe to repeat.
    pub async fn invalidate_product(&self, product_id: &str) -> bool {
        let result: Result<u64> = async {
            self.ensure_ready().await?;
            let mut doomed = vec![
                build_key(product_id, keys::PRODUCT),
                build_key(product_id, keys::PRICE),
            ];
            doomed.extend(self.backend.keys(&format!("{}*", keys::SEARCH)).await?);
            self.delete_keys(doomed).await
        }
        .await;

        match result {
            Ok(removed) => {
                info!("Invalidated product {} ({} keys)", product_id, removed);
                true
            }
            Err(e) => {
                self.record_failure("invalidate product", product_id, &e);
                false
            }
        }
    }

    // == Invalidate User ==
    /// Removes a user's profile, recommendations and every session whose
    /// key contains the user id.
    ///
    /// An empty id is rejected, since it would match every session.
    pub async fn invalidate_user_cache(&self, user_id: &str) -> bool {
        if user_id.is_empty() {
            warn!("Refusing to invalidate user cache for an empty user id");
            return false;
        }

        let result: Result<u64> = async {
            self.ensure_ready().await?;
            let mut doomed = vec![
                build_key(user_id, keys::USER),
                build_key(user_id, keys::RECOMMENDATION),
            ];
            let sessions = format!("{}*{}*", keys::SESSION, escape_glob(user_id));
            doomed.extend(self.backend.keys(&sessions).await?);
            self.delete_keys(doomed).await
        }
        .await;

        match result {
            Ok(removed) => {
                info!("Invalidated user {} ({} keys)", user_id, removed);
                true
            }
            Err(e) => {
                self.record_failure("invalidate user", user_id, &e);
                false
            }
        }
    }

    // == Statistics ==
    pub async fn get_statistics(&self) -> Statistics {
        Statistics {
            counters: self.stats.snapshot(),
            cluster: self.cluster.read().await.clone(),
        }
    }

    /// Liveness probe for health checks. Not counted in statistics.
    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    // == Shutdown ==
    /// Stops monitoring and closes the connection. Repeated calls are no-ops.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write().await;
            if matches!(*state, Lifecycle::ShuttingDown | Lifecycle::Disconnected) {
                return;
            }
            *state = Lifecycle::ShuttingDown;
        }
        info!("Shutting down cache manager");

        if let Some(handle) = self.monitor_handle.lock().await.take() {
            handle.stop().await;
            debug!("Monitoring task stopped");
        }
        if let Some(handle) = self.cleanup_handle.lock().await.take() {
            handle.abort();
            // Only cancellation is expected here
            let _ = handle.await;
            debug!("Cleanup task stopped");
        }

        let final_stats = self.stats.snapshot();
        info!(
            "Final cache stats: hits={} misses={} sets={} deletes={} errors={} hit_ratio={:.3}",
            final_stats.hits,
            final_stats.misses,
            final_stats.sets,
            final_stats.deletes,
            final_stats.errors,
            final_stats.hit_ratio
        );

        if let Err(e) = self.backend.close().await {
            warn!("Error closing cache backend: {}", e);
        }

        *self.state.write().await = Lifecycle::Disconnected;
        info!("Cache manager disconnected");
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor_handle.get_mut().take() {
            handle.abort();
        }
        if let Some(handle) = self.cleanup_handle.get_mut().take() {
            handle.abort();
        }
    }
}

fn encode<T: Serialize + ?Sized>(value: &T, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(value)?);
    }
    Ok(match serde_json::to_value(value)? {
        Value::String(raw) => raw,
        other => other.to_string(),
    })
}

fn decode(raw: &str, json: bool) -> Result<Value> {
    if json {
        Ok(serde_json::from_str(raw)?)
    } else {
        Ok(Value::String(raw.to_string()))
    }
}
