//! UDP forwarder.
//!
//! Each datagram is looked up by source address and sent on, byte for byte,
//! to the bound peer. Drops are silent toward the sender.

use super::table::DropReason;
use super::Relay;
use crate::clock::now_ms;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// Receive buffer size; larger datagrams are truncated by the OS.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Result of handling one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Sent to the peer.
    Sent(SocketAddr),
    /// Not routed.
    Dropped(DropReason),
    /// Routed, but the send failed.
    SendFailed(SocketAddr),
}

/// Route and send one datagram received from `from`.
pub async fn forward_datagram(
    relay: &Relay,
    socket: &UdpSocket,
    payload: &[u8],
    from: SocketAddr,
) -> Forwarded {
    let metrics = relay.metrics();

    let peer = match relay.sessions().resolve(canonical(from), now_ms()).await {
        Ok(peer) => peer,
        Err(reason) => {
            tracing::trace!("Dropped {} byte datagram from {}: {}", payload.len(), from, reason);
            metrics.datagrams_dropped_total.fetch_add(1, Ordering::Relaxed);
            return Forwarded::Dropped(reason);
        }
    };

    match socket.send_to(payload, peer).await {
        Ok(sent) => {
            metrics.datagrams_forwarded_total.fetch_add(1, Ordering::Relaxed);
            metrics
                .bytes_forwarded_total
                .fetch_add(sent as u64, Ordering::Relaxed);
            Forwarded::Sent(peer)
        }
        Err(e) => {
            tracing::warn!("Failed to forward datagram {} -> {}: {}", from, peer, e);
            metrics.datagrams_dropped_total.fetch_add(1, Ordering::Relaxed);
            Forwarded::SendFailed(peer)
        }
    }
}

/// Spawn the receive loop on `socket`. Runs until aborted.
pub fn spawn_forwarder(relay: Arc<Relay>, socket: Arc<UdpSocket>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, from)) => {
                    forward_datagram(&relay, &socket, &buf[..len], from).await;
                }
                // ICMP port-unreachable from a departed peer surfaces here on
                // some platforms; the socket stays usable.
                Err(e) => tracing::debug!("UDP receive error: {}", e),
            }
        }
    })
}

/// Fold IPv4-mapped IPv6 sources onto plain IPv4 so they match bound endpoints.
fn canonical(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}
