//! Session relay service.
//!
//! Two peers that cannot reach each other directly create a session over
//! HTTP, bind their observable UDP endpoints, then exchange datagrams through
//! the forwarder. Sessions idle past the TTL are reaped by the sweep task.

mod forwarder;
mod routes;
mod table;

pub use forwarder::{forward_datagram, spawn_forwarder, Forwarded, MAX_DATAGRAM};
pub use routes::router;
pub use table::{BindError, DropReason, Session, SessionTable};

use crate::cleanup::{spawn_cleanup_task, Expiring};
use crate::clock::Ttl;
use crate::config::Config;
use crate::error::ServiceError;
use crate::limits::RateLimits;
use crate::server::{bind_tcp, bind_udp, ServiceHandle};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Name reported by `GET /health`.
pub const SERVICE_NAME: &str = "noc-relay-service";

/// Operational counters, monotonically increasing until restart.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Sessions created.
    pub sessions_created_total: AtomicU64,
    /// Successful binds.
    pub binds_total: AtomicU64,
    /// Datagrams sent on to a peer.
    pub datagrams_forwarded_total: AtomicU64,
    /// Datagrams dropped (unknown sender, expired session, unbound peer).
    pub datagrams_dropped_total: AtomicU64,
    /// Payload bytes sent on to peers.
    pub bytes_forwarded_total: AtomicU64,
    /// Sessions removed by the sweep.
    pub sessions_expired_total: AtomicU64,
    /// Requests rejected by rate limiting.
    pub rate_limit_hits: AtomicU64,
}

/// The relay: session table plus the handler-facing ambient state.
#[derive(Debug)]
pub struct Relay {
    config: Config,
    sessions: SessionTable,
    rate_limits: RateLimits,
    metrics: RelayMetrics,
}

impl Relay {
    /// Create a relay with an empty session table.
    pub fn new(config: Config) -> Self {
        let sessions = SessionTable::new(Ttl::from_millis(config.relay.session_ttl_ms));
        let rate_limits = RateLimits::new(&config.limits);
        Self {
            config,
            sessions,
            rate_limits,
            metrics: RelayMetrics::default(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the session table.
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }
}

#[async_trait]
impl Expiring for Relay {
    fn kind(&self) -> &'static str {
        "sessions"
    }

    async fn sweep_expired(&self, now_ms: u64) -> usize {
        let removed = self.sessions.sweep_expired(now_ms).await;
        self.metrics
            .sessions_expired_total
            .fetch_add(removed as u64, Ordering::Relaxed);
        self.rate_limits.shrink();
        removed
    }
}

/// A running relay.
#[derive(Debug)]
pub struct RunningRelay {
    relay: Arc<Relay>,
    handle: ServiceHandle,
    udp_addr: SocketAddr,
}

impl RunningRelay {
    /// Shared relay state.
    pub fn relay(&self) -> Arc<Relay> {
        self.relay.clone()
    }

    /// Address of the HTTP API.
    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// Address of the UDP forwarder.
    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    /// Shut the relay down. Sessions are discarded.
    pub async fn stop(self) -> Result<(), ServiceError> {
        tracing::info!("Relay stopping");
        self.handle.stop().await
    }
}

/// Bind the HTTP listener and UDP socket, then start serving, forwarding and
/// sweeping.
///
/// When `relay.udp_port` is 0 the OS picks the port and the bound port is what
/// create responses and `/health` report.
pub async fn start(mut config: Config) -> Result<RunningRelay, ServiceError> {
    let listener = bind_tcp(&config.relay.host, config.relay.api_port).await?;
    let socket = bind_udp(&config.relay.host, config.relay.udp_port).await?;
    let udp_addr = socket.local_addr()?;
    config.relay.udp_port = udp_addr.port();

    let relay = Arc::new(Relay::new(config));

    let forwarder = spawn_forwarder(relay.clone(), Arc::new(socket));
    let cleanup = spawn_cleanup_task(relay.clone(), relay.config.cleanup.clone());
    let router = router(relay.clone());
    let handle = ServiceHandle::spawn(listener, router, vec![forwarder, cleanup])?;

    tracing::info!(
        "Relay API listening on http://{}, UDP forwarder on {} (session TTL: {}ms)",
        handle.local_addr(),
        udp_addr,
        relay.config.relay.session_ttl_ms
    );

    Ok(RunningRelay {
        relay,
        handle,
        udp_addr,
    })
}
