//! Cluster Info Module
//!
//! Snapshot of cluster topology parsed from `CLUSTER INFO` output.

use serde::Serialize;

// == Cluster Info ==
/// Topology and health of the cluster at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    /// `ok` or `fail`
    pub state: String,
    pub slots_assigned: u32,
    pub slots_ok: u32,
    pub slots_pfail: u32,
    pub slots_fail: u32,
    pub known_nodes: u32,
    /// Number of master nodes serving slots
    pub size: u32,
}

impl ClusterInfo {
    /// Info reported by a single-node store that owns every slot.
    pub fn standalone() -> Self {
        Self {
            state: "ok".to_string(),
            slots_assigned: 16384,
            slots_ok: 16384,
            slots_pfail: 0,
            slots_fail: 0,
            known_nodes: 1,
            size: 1,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.state == "ok" && self.slots_fail == 0
    }

    // == Parse ==
    /// Parses the `field:value` lines returned by `CLUSTER INFO`.
    ///
    /// Unknown fields are ignored and missing ones default to zero. The
    /// state defaults to `unknown` when the reply carries none.
    pub fn parse(raw: &str) -> Self {
        let mut info = Self {
            state: "unknown".to_string(),
            slots_assigned: 0,
            slots_ok: 0,
            slots_pfail: 0,
            slots_fail: 0,
            known_nodes: 0,
            size: 0,
        };

        for line in raw.lines() {
            let Some((field, value)) = line.trim().split_once(':') else {
                continue;
            };
            let number = || value.trim().parse::<u32>().unwrap_or(0);
            match field {
                "cluster_state" => info.state = value.trim().to_string(),
                "cluster_slots_assigned" => info.slots_assigned = number(),
                "cluster_slots_ok" => info.slots_ok = number(),
                "cluster_slots_pfail" => info.slots_pfail = number(),
                "cluster_slots_fail" => info.slots_fail = number(),
                "cluster_known_nodes" => info.known_nodes = number(),
                "cluster_size" => info.size = number(),
                _ => {}
            }
        }

        info
    }
}
