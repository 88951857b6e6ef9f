//! Room registry service.
//!
//! Hosts advertise worlds with `open` and keep them listed with periodic
//! heartbeats. Rooms that stop heartbeating vanish from the listing once
//! their TTL passes and are reaped by the sweep task; the owner is not told.

mod routes;
mod store;
mod validate;

pub use routes::router;
pub use store::{DirectoryError, Room, RoomDirectory, RoomDraft};
pub use validate::room_draft;

use crate::cleanup::{spawn_cleanup_task, Expiring};
use crate::clock::Ttl;
use crate::config::Config;
use crate::error::ServiceError;
use crate::limits::RateLimits;
use crate::server::{bind_tcp, ServiceHandle};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Name reported by `GET /health`.
pub const SERVICE_NAME: &str = "noc-local-servers-registry";

/// Operational counters, monotonically increasing until restart.
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    /// Rooms opened.
    pub rooms_opened_total: AtomicU64,
    /// Opens rejected by the per-host cap.
    pub rooms_rejected_total: AtomicU64,
    /// Rooms refreshed by heartbeats.
    pub heartbeats_total: AtomicU64,
    /// Rooms removed by close.
    pub rooms_closed_total: AtomicU64,
    /// Rooms removed by the sweep.
    pub rooms_expired_total: AtomicU64,
    /// Successful join-by-code lookups.
    pub joins_total: AtomicU64,
    /// Requests rejected by rate limiting.
    pub rate_limit_hits: AtomicU64,
}

/// The registry: room directory plus the handler-facing ambient state.
#[derive(Debug)]
pub struct Registry {
    config: Config,
    rooms: RoomDirectory,
    rate_limits: RateLimits,
    metrics: RegistryMetrics,
}

impl Registry {
    /// Create a registry with an empty directory.
    pub fn new(config: Config) -> Self {
        let rooms = RoomDirectory::new(
            Ttl::from_millis(config.registry.room_ttl_ms),
            config.registry.max_rooms_per_host,
        );
        let rate_limits = RateLimits::new(&config.limits);
        Self {
            config,
            rooms,
            rate_limits,
            metrics: RegistryMetrics::default(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the room directory.
    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }
}

#[async_trait]
impl Expiring for Registry {
    fn kind(&self) -> &'static str {
        "rooms"
    }

    async fn sweep_expired(&self, now_ms: u64) -> usize {
        let removed = self.rooms.sweep_expired(now_ms).await;
        self.metrics
            .rooms_expired_total
            .fetch_add(removed as u64, Ordering::Relaxed);
        self.rate_limits.shrink();
        removed
    }
}

/// A running registry.
#[derive(Debug)]
pub struct RunningRegistry {
    registry: Arc<Registry>,
    handle: ServiceHandle,
}

impl RunningRegistry {
    /// Shared registry state.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Address of the HTTP API.
    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// Shut the registry down. Tracked rooms are discarded.
    pub async fn stop(self) -> Result<(), ServiceError> {
        tracing::info!("Registry stopping");
        self.handle.stop().await
    }
}

/// Bind the HTTP listener and start serving plus the sweep task.
pub async fn start(config: Config) -> Result<RunningRegistry, ServiceError> {
    let listener = bind_tcp(&config.registry.host, config.registry.port).await?;
    let registry = Arc::new(Registry::new(config));

    let cleanup = spawn_cleanup_task(registry.clone(), registry.config.cleanup.clone());
    let router = router(registry.clone());
    let handle = ServiceHandle::spawn(listener, router, vec![cleanup])?;

    tracing::info!(
        "Registry listening on http://{} (room TTL: {}ms, max rooms per host: {})",
        handle.local_addr(),
        registry.config.registry.room_ttl_ms,
        registry.config.registry.max_rooms_per_host
    );

    Ok(RunningRegistry { registry, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::store::tests::draft;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.registry.host = "127.0.0.1".to_string();
        config.registry.port = 0;
        config.registry.room_ttl_ms = 1000;
        config
    }

    #[tokio::test]
    async fn sweep_counts_expired_rooms() {
        let registry = Registry::new(test_config());
        registry.rooms().open(draft("h1"), 0).await.unwrap();
        registry.rooms().open(draft("h2"), 900).await.unwrap();

        assert_eq!(registry.sweep_expired(1500).await, 1);
        assert_eq!(
            registry.metrics().rooms_expired_total.load(Ordering::Relaxed),
            1
        );
        assert_eq!(registry.rooms().len().await, 1);
    }

    #[tokio::test]
    async fn start_and_stop() {
        let running = start(test_config()).await.unwrap();
        assert_ne!(running.local_addr().port(), 0);
        assert!(running.registry().rooms().is_empty().await);
        running.stop().await.unwrap();
    }
}
