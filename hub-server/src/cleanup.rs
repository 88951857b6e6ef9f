//! Background sweep task for expired rooms and sessions.
//!
//! Runs periodically and removes entries that have crossed their TTL. The
//! sweep holds a store's lock only for the retain pass, so request handling
//! and forwarding keep running between ticks.

use crate::clock::now_ms;
use crate::config::CleanupConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Something that owns TTL-bound entries.
#[async_trait]
pub trait Expiring: Send + Sync + 'static {
    /// Short name used in log lines, e.g. `rooms`.
    fn kind(&self) -> &'static str;

    /// Remove entries that are no longer live at `now_ms`.
    ///
    /// Returns the number of entries deleted.
    async fn sweep_expired(&self, now_ms: u64) -> usize;
}

/// Spawn a background sweep task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task<T: Expiring>(
    target: Arc<T>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_ms = config.interval_ms.max(1);
        tracing::info!(
            "Cleanup task started for {} (interval: {}ms)",
            target.kind(),
            interval_ms
        );

        let mut timer = interval(Duration::from_millis(interval_ms));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            let deleted = target.sweep_expired(now_ms()).await;
            if deleted > 0 {
                tracing::info!("Cleanup: deleted {} expired {}", deleted, target.kind());
            } else {
                tracing::debug!("Cleanup: no expired {}", target.kind());
            }
        }
    })
}
