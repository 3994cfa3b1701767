use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::registry::JobRegistry;

/// Evict finished jobs older than `retention`, returning how many were removed.
/// A retention reaching past the representable time range evicts nothing.
pub fn sweep_once(registry: &JobRegistry, retention: chrono::Duration) -> usize {
    let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
        tracing::warn!(
            retention_secs = retention.num_seconds(),
            "Retention cutoff out of range, sweep skipped"
        );
        return 0;
    };
    let evicted = registry.evict_finished_before(cutoff);
    if evicted > 0 {
        metrics::counter!("parse_jobs_evicted_total").increment(evicted as u64);
        tracing::debug!(evicted, remaining = registry.len(), "Evicted finished jobs");
    }
    metrics::gauge!("parse_jobs_tracked").set(registry.len() as f64);
    evicted
}

/// Background task that bounds registry growth by running [`sweep_once`]
/// every `interval`.
pub fn spawn_retention_sweeper(
    registry: Arc<JobRegistry>,
    retention: chrono::Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tracing::info!(
        retention_secs = retention.num_seconds(),
        interval_secs = interval.as_secs(),
        "Starting job retention sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(&registry, retention);
        }
    })
}
