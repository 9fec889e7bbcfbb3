//! Configuration Module
//!
//! Handles loading and managing cache manager configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::TtlPolicy;

/// Which store implementation backs the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Redis cluster over the node list
    Cluster,
    /// In-process map, for local runs and tests
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cluster" | "redis" => Ok(BackendKind::Cluster),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Cache manager configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store implementation
    pub backend: BackendKind,
    /// Cluster seed nodes as `host:port`
    pub nodes: Vec<String>,
    /// Optional cluster password
    pub password: Option<String>,
    /// Default TTLs per key category
    pub ttl: TtlPolicy,
    /// Monitoring loop interval in seconds
    pub monitor_interval: u64,
    /// Skip a monitoring tick while the previous one is still running
    pub monitor_skip_overlap: bool,
    /// Expired entry cleanup interval in seconds, for lazily expiring stores
    pub cleanup_interval: u64,
    /// JSON-lines file the monitor appends snapshots to
    pub stats_log_path: PathBuf,
    /// Cluster client retry count
    pub max_retries: u32,
    /// Minimum wait between cluster client retries in milliseconds
    pub retry_delay_ms: u64,
    /// Send commands issued before the manager is ready instead of failing them
    pub offline_queue: bool,
    /// Port for the diagnostics HTTP server, disabled when None
    pub stats_port: Option<u16>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `cluster` or `memory` (default: cluster)
    /// - `REDIS_CLUSTER_NODES` - Comma separated `host:port` list
    /// - `REDIS_PASSWORD` - Cluster password (default: none)
    /// - `CACHE_TTL_DEFAULT`, `CACHE_TTL_PRODUCTS`, `CACHE_TTL_PRICES`,
    ///   `CACHE_TTL_SESSIONS`, `CACHE_TTL_SEARCH`, `CACHE_TTL_RECOMMENDATIONS`
    /// - `CACHE_MONITOR_INTERVAL` - Monitoring interval in seconds (default: 60)
    /// - `CACHE_MONITOR_SKIP_OVERLAP` - Guard against overlapping ticks (default: false)
    /// - `CACHE_CLEANUP_INTERVAL` - Memory store cleanup interval in seconds (default: 60)
    /// - `CACHE_STATS_LOG` - Stats log path (default: logs/cache-stats.log)
    /// - `REDIS_MAX_RETRIES` - Retry count (default: 3)
    /// - `REDIS_RETRY_DELAY_MS` - Retry delay (default: 100)
    /// - `REDIS_OFFLINE_QUEUE` - Offline queue enabled (default: true)
    /// - `STATS_PORT` - Diagnostics HTTP port (default: disabled)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ttl_defaults = defaults.ttl.clone();

        Self {
            backend: env_parse("CACHE_BACKEND").unwrap_or(defaults.backend),
            nodes: env::var("REDIS_CLUSTER_NODES")
                .ok()
                .map(|v| parse_nodes(&v))
                .filter(|nodes| !nodes.is_empty())
                .unwrap_or(defaults.nodes),
            password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            ttl: TtlPolicy {
                default: env_parse("CACHE_TTL_DEFAULT").unwrap_or(ttl_defaults.default),
                products: env_parse("CACHE_TTL_PRODUCTS").unwrap_or(ttl_defaults.products),
                prices: env_parse("CACHE_TTL_PRICES").unwrap_or(ttl_defaults.prices),
                sessions: env_parse("CACHE_TTL_SESSIONS").unwrap_or(ttl_defaults.sessions),
                search: env_parse("CACHE_TTL_SEARCH").unwrap_or(ttl_defaults.search),
                recommendations: env_parse("CACHE_TTL_RECOMMENDATIONS")
                    .unwrap_or(ttl_defaults.recommendations),
            },
            monitor_interval: env_parse("CACHE_MONITOR_INTERVAL")
                .unwrap_or(defaults.monitor_interval),
            monitor_skip_overlap: env_parse("CACHE_MONITOR_SKIP_OVERLAP")
                .unwrap_or(defaults.monitor_skip_overlap),
            cleanup_interval: env_parse("CACHE_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cleanup_interval),
            stats_log_path: env::var("CACHE_STATS_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.stats_log_path),
            max_retries: env_parse("REDIS_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay_ms: env_parse("REDIS_RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
            offline_queue: env_parse("REDIS_OFFLINE_QUEUE").unwrap_or(defaults.offline_queue),
            stats_port: env_parse("STATS_PORT"),
        }
    }

    /// Monitoring interval as a Duration.
    pub fn monitor_period(&self) -> Duration {
        Duration::from_secs(self.monitor_interval.max(1))
    }

    /// Cleanup interval as a Duration.
    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Cluster,
            nodes: vec![
                "127.0.0.1:7000".to_string(),
                "127.0.0.1:7001".to_string(),
                "127.0.0.1:7002".to_string(),
            ],
            password: None,
            ttl: TtlPolicy::default(),
            monitor_interval: 60,
            monitor_skip_overlap: false,
            cleanup_interval: 60,
            stats_log_path: PathBuf::from("logs/cache-stats.log"),
            max_retries: 3,
            retry_delay_ms: 100,
            offline_queue: true,
            stats_port: None,
        }
    }
}

/// Splits a comma separated node list, dropping blanks.
pub fn parse_nodes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|node| !node.is_empty())
        .map(String::from)
        .collect()
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Cluster);
        assert_eq!(config.nodes.len(), 3);
        assert_eq!(config.ttl.products, 1800);
        assert_eq!(config.monitor_interval, 60);
        assert_eq!(config.max_retries, 3);
        assert!(config.offline_queue);
        assert!(config.stats_port.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("REDIS_CLUSTER_NODES");
        env::remove_var("CACHE_TTL_PRICES");
        env::remove_var("CACHE_MONITOR_INTERVAL");
        env::remove_var("REDIS_OFFLINE_QUEUE");

        let config = Config::from_env();
        assert_eq!(config.nodes, Config::default().nodes);
        assert_eq!(config.ttl.prices, 300);
        assert_eq!(config.monitor_interval, 60);
        assert!(config.offline_queue);
    }

    #[test]
    fn test_parse_nodes_trims_and_skips_blanks() {
        let nodes = parse_nodes(" redis-1:6379, ,redis-2:6379,");
        assert_eq!(nodes, vec!["redis-1:6379", "redis-2:6379"]);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("memory".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert_eq!("Cluster".parse::<BackendKind>(), Ok(BackendKind::Cluster));
        assert!("sqlite".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_monitor_interval_never_zero() {
        let config = Config {
            monitor_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.monitor_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_cleanup_interval_never_zero() {
        let config = Config {
            cleanup_interval: 0,
            ..Config::default()
        };
        assert_eq!(Config::default().cleanup_period(), Duration::from_secs(60));
        assert_eq!(config.cleanup_period(), Duration::from_secs(1));
    }
}
