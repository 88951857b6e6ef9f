//! Socket binding and HTTP server lifecycle shared by both services.

use crate::error::ServiceError;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::{lookup_host, TcpListener, UdpSocket};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Resolve `host:port` to the first matching socket address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ServiceError> {
    let invalid = || ServiceError::InvalidAddress {
        host: host.to_string(),
        port,
    };

    lookup_host((host, port))
        .await
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}

/// Bind the HTTP listener. Failure here is fatal for the service.
pub async fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ServiceError> {
    let addr = resolve(host, port).await?;
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServiceError::Bind { addr, source })
}

/// Bind the relay's datagram socket. Failure here is fatal for the service.
pub async fn bind_udp(host: &str, port: u16) -> Result<UdpSocket, ServiceError> {
    let addr = resolve(host, port).await?;
    UdpSocket::bind(addr)
        .await
        .map_err(|source| ServiceError::Bind { addr, source })
}

/// A started service: its HTTP server plus background tasks.
#[derive(Debug)]
pub struct ServiceHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
    background: Vec<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Serve `router` on `listener` until [`ServiceHandle::stop`] is called.
    ///
    /// `background` tasks (sweeps, the forwarder) are aborted on stop.
    pub fn spawn(
        listener: TcpListener,
        router: Router,
        background: Vec<JoinHandle<()>>,
    ) -> Result<Self, ServiceError> {
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        });

        Ok(Self {
            local_addr,
            shutdown,
            server,
            background,
        })
    }

    /// Address the HTTP server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting requests, let in-flight requests finish and abort the
    /// background tasks. All in-memory state is dropped with the service.
    pub async fn stop(self) -> Result<(), ServiceError> {
        for task in &self.background {
            task.abort();
        }
        let _ = self.shutdown.send(());

        match self.server.await {
            Ok(result) => result.map_err(ServiceError::Io),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(ServiceError::Io(std::io::Error::other(e))),
        }
    }
}
