//! HTTP plumbing shared by the registry and relay routers.
//!
//! Provides the JSON body extractor, CORS and panic middleware, the 404
//! fallback and the Prometheus text response.

mod body;
mod middleware;

pub use body::{json_number, parse_body, JsonBody};

use crate::error::ApiError;
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Router;
use std::net::{IpAddr, SocketAddr};

/// Wrap a service router with the layers both services share.
///
/// Order matters: CORS must see the response produced by the panic catcher,
/// and the body limit must be installed before any handler reads a body.
pub fn with_common_layers(router: Router, max_body_bytes: usize) -> Router {
    router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(middleware::catch_panic))
        .layer(axum::middleware::from_fn(middleware::cors))
}

/// Fallback for unknown routes.
async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Client IP from the connection, when the server was started with connect info.
pub fn client_ip(peer: Option<ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    peer.map(|ConnectInfo(addr)| addr.ip().to_canonical())
}

/// Prometheus text exposition response.
pub fn prometheus(body: String) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
