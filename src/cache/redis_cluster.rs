//! Redis Cluster Backend Module
//!
//! Drives a Redis cluster through one multiplexed async cluster connection
//! shared by every caller. Slot routing, redirects and reconnects are
//! handled by the cluster client.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use redis::cluster::{ClusterClient, ClusterClientBuilder};
use redis::cluster_async::ClusterConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::backend::{ttl_secs, BatchWrite, CacheBackend};
use crate::cache::ClusterInfo;
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Redis Cluster Backend ==
pub struct RedisClusterBackend {
    client: ClusterClient,
    /// None until `connect` succeeds and after `close`
    conn: RwLock<Option<ClusterConnection>>,
}

impl RedisClusterBackend {
    // == Constructor ==
    /// Builds the cluster client from configuration without connecting.
    pub fn new(config: &Config) -> Result<Self> {
        if config.nodes.is_empty() {
            return Err(CacheError::Config(
                "no cluster nodes configured".to_string(),
            ));
        }

        let nodes: Vec<String> = config.nodes.iter().map(|node| node_url(node)).collect();
        let mut builder: ClusterClientBuilder = ClusterClient::builder(nodes)
            .retries(config.max_retries)
            .min_retry_wait(config.retry_delay_ms);
        if let Some(password) = &config.password {
            builder = builder.password(password.clone());
        }

        let client = builder
            .build()
            .map_err(|e| CacheError::Config(format!("invalid cluster configuration: {}", e)))?;

        Ok(Self {
            client,
            conn: RwLock::new(None),
        })
    }

    async fn connection(&self) -> Result<ClusterConnection> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| CacheError::Backend("cluster connection not established".to_string()))
    }
}

/// Adds the `redis://` scheme to bare `host:port` addresses.
pub fn node_url(node: &str) -> String {
    if node.contains("://") {
        node.to_string()
    } else {
        format!("redis://{}", node)
    }
}

#[async_trait]
impl CacheBackend for RedisClusterBackend {
    fn name(&self) -> &'static str {
        "redis-cluster"
    }

    async fn connect(&self) -> Result<()> {
        let conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        info!("Redis cluster connected");
        *self.conn.write().await = Some(conn);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis cluster ping: {}", reply);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        // MGET is split per slot by the cluster client and reassembled in order
        let values: Vec<Option<String>> = conn.mget(keys).await?;
        Ok(values)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn set_many_ex(&self, entries: &[BatchWrite]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let conn = self.connection().await?;
        // Issued back to back on the multiplexed connection; keys may live
        // in different slots so one node-level pipeline cannot carry them.
        let writes = entries.iter().map(|entry| {
            let mut conn = conn.clone();
            async move {
                let _: () = conn
                    .set_ex(&entry.key, &entry.value, ttl_secs(entry.ttl))
                    .await?;
                Ok::<(), redis::RedisError>(())
            }
        });
        try_join_all(writes).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let applied: bool = conn.expire(key, seconds).await?;
        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.connection().await?;
        let remaining: i64 = conn.ttl(key).await?;
        // -2 means the key does not exist
        Ok((remaining != -2).then_some(remaining))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        // KEYS fans out to every master and the replies are concatenated
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }

    async fn cluster_info(&self) -> Result<ClusterInfo> {
        let mut conn = self.connection().await?;
        let raw: String = redis::cmd("CLUSTER")
            .arg("INFO")
            .query_async(&mut conn)
            .await?;
        Ok(ClusterInfo::parse(&raw))
    }

    async fn close(&self) -> Result<()> {
        if self.conn.write().await.take().is_some() {
            info!("Redis cluster connection closed");
        }
        Ok(())
    }
}
