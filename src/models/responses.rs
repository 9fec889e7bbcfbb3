//! Response DTOs for the diagnostics API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{Lifecycle, Statistics};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub statistics: Statistics,
    /// Manager lifecycle state
    pub state: Lifecycle,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl StatsResponse {
    /// Creates a new StatsResponse stamped with the current time
    pub fn new(statistics: Statistics, state: Lifecycle) -> Self {
        Self {
            statistics,
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Manager lifecycle state
    pub state: Lifecycle,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(state: Lifecycle) -> Self {
        Self {
            status: "healthy".to_string(),
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ClusterInfo, StatsSnapshot};

    #[test]
    fn test_stats_response_flattens_counters() {
        let statistics = Statistics {
            counters: StatsSnapshot {
                hits: 8,
                misses: 2,
                hit_ratio: 0.8,
                ..StatsSnapshot::default()
            },
            cluster: Some(ClusterInfo::standalone()),
        };
        let json = serde_json::to_value(StatsResponse::new(statistics, Lifecycle::Ready)).unwrap();

        assert_eq!(json["hits"], 8);
        assert_eq!(json["hitRatio"], 0.8);
        assert_eq!(json["state"], "ready");
        assert_eq!(json["cluster"]["knownNodes"], 1);
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(Lifecycle::Ready);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("ready"));
    }
}
