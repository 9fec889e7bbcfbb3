//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the manager is ready.
//!
//! # Tasks
//! - Monitoring: samples cluster health and hit ratio into a JSON-lines log
//! - Cleanup: reclaims expired entries from lazily expiring stores

mod cleanup;
mod monitor;

pub use cleanup::spawn_cleanup_task;
pub use monitor::{
    sample, spawn_monitor_task, MonitorContext, MonitorHandle, MonitorRecord, MonitorSettings,
};
