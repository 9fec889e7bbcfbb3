//! Cluster Monitoring Task
//!
//! Background task that periodically samples cluster health and cache
//! statistics and appends them to a JSON-lines log.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::backend::CacheBackend;
use crate::cache::{CacheStats, ClusterInfo, StatsSnapshot};
use crate::config::Config;
use crate::error::Result;

/// Monitoring cadence and output.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub log_path: PathBuf,
    /// Skip a tick while the previous one is still running
    pub skip_overlapping: bool,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.monitor_period(),
            log_path: config.stats_log_path.clone(),
            skip_overlapping: config.monitor_skip_overlap,
        }
    }
}

/// Shared handles a monitoring tick reads from and writes to.
#[derive(Clone)]
pub struct MonitorContext {
    pub backend: Arc<dyn CacheBackend>,
    pub stats: Arc<CacheStats>,
    pub cluster: Arc<RwLock<Option<ClusterInfo>>>,
    pub log_path: PathBuf,
}

/// One line of the stats log.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorRecord {
    pub timestamp: String,
    pub stats: StatsSnapshot,
    pub cluster: ClusterInfo,
}

/// Running monitoring loop.
///
/// Per-tick samples belong to the loop, so stopping it also cancels any
/// sample still talking to the backend.
#[derive(Debug)]
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stops the loop and waits until no sample is left running.
    pub async fn stop(self) {
        // Fails only when the loop is already gone
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            if e.is_panic() {
                warn!("Cache monitoring task panicked: {}", e);
            }
        }
    }

    /// Cancels the loop without waiting. Dropping the loop cancels its samples.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the monitoring loop.
///
/// Ticks fire at a fixed rate and each runs as its own task, so a slow
/// sample does not delay the next one. With `skip_overlapping` set, a tick
/// that finds the previous sample still running is skipped instead.
///
/// # Returns
/// A MonitorHandle, stopped during shutdown.
pub fn spawn_monitor_task(ctx: MonitorContext, settings: &MonitorSettings) -> MonitorHandle {
    let interval = settings.interval;
    let skip_overlapping = settings.skip_overlapping;
    let (stop, mut stop_requested) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            "Starting cache monitoring task with interval of {} seconds",
            interval.as_secs_f64()
        );

        let in_flight = Arc::new(AtomicBool::new(false));
        let mut samples = JoinSet::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; sampling starts one interval in
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = stop_requested.changed() => break,
                _ = ticker.tick() => {
                    if skip_overlapping && in_flight.swap(true, Ordering::AcqRel) {
                        debug!("Previous monitoring sample still running, skipping tick");
                    } else {
                        let ctx = ctx.clone();
                        let in_flight = in_flight.clone();
                        samples.spawn(async move {
                            if let Err(e) = sample(&ctx).await {
                                warn!("Cache monitoring failed: {}", e);
                            }
                            in_flight.store(false, Ordering::Release);
                        });
                    }
                }
                Some(_) = samples.join_next(), if !samples.is_empty() => {}
            }
        }

        samples.shutdown().await;
        debug!("Cache monitoring task stopped");
    });

    MonitorHandle { stop, task }
}

/// Takes one sample: refreshes the cluster snapshot and appends a log line.
pub async fn sample(ctx: &MonitorContext) -> Result<MonitorRecord> {
    let cluster = ctx.backend.cluster_info().await?;
    *ctx.cluster.write().await = Some(cluster.clone());

    let record = MonitorRecord {
        timestamp: chrono::Utc::now().to_rfc3339(),
        stats: ctx.stats.snapshot(),
        cluster,
    };
    append_record(&ctx.log_path, &record).await?;

    info!(
        "Cache stats: hits={} misses={} errors={} hit_ratio={:.3} cluster_state={}",
        record.stats.hits,
        record.stats.misses,
        record.stats.errors,
        record.stats.hit_ratio,
        record.cluster.state
    );
    Ok(record)
}

async fn append_record(path: &Path, record: &MonitorRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}
