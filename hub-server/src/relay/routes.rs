//! Relay HTTP endpoints.

use super::table::BindError;
use super::{Relay, SERVICE_NAME};
use crate::clock::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::http::{client_ip, json_number, prometheus, with_common_layers, JsonBody};
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Query};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use hub_types::relay::{
    BindRequest, BindResponse, CreateSessionRequest, CreateSessionResponse, RelayAddress,
    RelayHealth, SessionStatusResponse,
};
use hub_types::{Role, SessionId};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const ROOM_ID_MAX: usize = 128;

/// Build the relay router.
pub fn router(relay: Arc<Relay>) -> Router {
    let max_body_bytes = relay.config().http.max_body_bytes;
    let routes = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/session/create", post(create_session))
        .route("/session/bind", post(bind_session))
        .route("/session/status", get(session_status));

    with_common_layers(routes, max_body_bytes).layer(Extension(relay))
}

impl From<BindError> for ApiError {
    fn from(err: BindError) -> Self {
        match err {
            BindError::SessionNotFound => ApiError::SessionNotFound,
            BindError::InvalidToken => ApiError::InvalidToken,
        }
    }
}

/// Trimmed, non-blank text.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

async fn health(Extension(relay): Extension<Arc<Relay>>) -> Json<RelayHealth> {
    Json(RelayHealth {
        ok: true,
        service: SERVICE_NAME.to_string(),
        sessions: relay.sessions().live_count(now_ms()).await,
        udp_port: relay.config().relay.udp_port,
    })
}

async fn create_session(
    Extension(relay): Extension<Arc<Relay>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    JsonBody(req): JsonBody<CreateSessionRequest>,
) -> ApiResult<Json<CreateSessionResponse>> {
    if let Err(e) = relay.rate_limits().check(client_ip(peer)) {
        tracing::warn!("Create rejected: {}", e);
        relay.metrics().rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        return Err(ApiError::RateLimited);
    }

    let room_id = present(req.room_id.as_deref())
        .map(|id| id.chars().take(ROOM_ID_MAX).collect::<String>())
        .ok_or(ApiError::RoomIdRequired)?;

    let host = present(req.public_relay_host.as_deref())
        .map(str::to_string)
        .or_else(|| relay.config().relay.public_host.clone());

    let session = relay.sessions().create(room_id, now_ms()).await;

    relay
        .metrics()
        .sessions_created_total
        .fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        "Session created: {:?} for room {:?}",
        session.session_id,
        session.room_id
    );

    Ok(Json(CreateSessionResponse {
        ok: true,
        session_id: session.session_id,
        relay: RelayAddress {
            host,
            udp_port: relay.config().relay.udp_port,
        },
        host_token: session.host_token,
        player_token: session.player_token,
    }))
}

/// Validated bind request fields.
struct BindTarget<'a> {
    session_id: Option<SessionId>,
    role: Role,
    endpoint: SocketAddr,
    token: Option<&'a str>,
}

fn bind_target(req: &BindRequest) -> ApiResult<BindTarget<'_>> {
    let (Some(session_id), Some(role), Some(address), Some(port)) = (
        present(req.session_id.as_deref()),
        present(req.role.as_deref()),
        present(req.address.as_deref()),
        req.port.as_ref().filter(|p| json_number(p) != Some(0.0)),
    ) else {
        return Err(ApiError::BindFieldsRequired);
    };

    let role: Role = role.parse().map_err(|_| ApiError::InvalidRole)?;
    let ip: IpAddr = address.parse().map_err(|_| ApiError::InvalidAddress)?;
    let port = json_number(port)
        .filter(|p| p.fract() == 0.0 && (1.0..=65535.0).contains(p))
        .ok_or(ApiError::InvalidPort)? as u16;

    Ok(BindTarget {
        session_id: SessionId::parse(session_id),
        role,
        endpoint: SocketAddr::new(ip.to_canonical(), port),
        token: present(req.token.as_deref()),
    })
}

async fn bind_session(
    Extension(relay): Extension<Arc<Relay>>,
    JsonBody(req): JsonBody<BindRequest>,
) -> ApiResult<Json<BindResponse>> {
    let target = bind_target(&req)?;
    let session_id = target.session_id.ok_or(ApiError::SessionNotFound)?;

    let ready = relay
        .sessions()
        .bind(
            session_id,
            target.role,
            target.endpoint,
            target.token,
            relay.config().relay.require_tokens,
            now_ms(),
        )
        .await
        .map_err(|e| {
            tracing::debug!("Bind rejected for {:?}: {}", session_id, e);
            ApiError::from(e)
        })?;

    relay.metrics().binds_total.fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        "Bound {} of {:?} to {} (ready: {})",
        target.role,
        session_id,
        target.endpoint,
        ready
    );

    Ok(Json(BindResponse { ok: true, ready }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusQuery {
    session_id: Option<String>,
}

async fn session_status(
    Extension(relay): Extension<Arc<Relay>>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let Query(query) = query.map_err(|_| ApiError::InvalidQuery)?;
    let raw = present(query.session_id.as_deref()).ok_or(ApiError::SessionIdRequired)?;

    let session = match SessionId::parse(raw) {
        Some(id) => relay.sessions().status(id, now_ms()).await,
        None => None,
    }
    .ok_or(ApiError::SessionNotFound)?;

    Ok(Json(SessionStatusResponse { ok: true, session }))
}

/// Prometheus metrics handler.
async fn metrics(Extension(relay): Extension<Arc<Relay>>) -> impl IntoResponse {
    let m = relay.metrics();

    // Gauges
    let live = relay.sessions().live_count(now_ms()).await;
    let sessions = relay.sessions().len().await;
    let routes = relay.sessions().route_count().await;

    // Counters
    let created = m.sessions_created_total.load(Ordering::Relaxed);
    let binds = m.binds_total.load(Ordering::Relaxed);
    let forwarded = m.datagrams_forwarded_total.load(Ordering::Relaxed);
    let dropped = m.datagrams_dropped_total.load(Ordering::Relaxed);
    let bytes = m.bytes_forwarded_total.load(Ordering::Relaxed);
    let expired = m.sessions_expired_total.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);

    prometheus(format!(
        r#"# HELP noc_relay_sessions_live Sessions passing the liveness check
# TYPE noc_relay_sessions_live gauge
noc_relay_sessions_live {live}

# HELP noc_relay_sessions Sessions held in memory, including unswept expired sessions
# TYPE noc_relay_sessions gauge
noc_relay_sessions {sessions}

# HELP noc_relay_routes Routing entries held in memory
# TYPE noc_relay_routes gauge
noc_relay_routes {routes}

# HELP noc_relay_info Server information
# TYPE noc_relay_info gauge
noc_relay_info{{version="{version}"}} 1

# HELP noc_relay_sessions_created_total Sessions created
# TYPE noc_relay_sessions_created_total counter
noc_relay_sessions_created_total {created}

# HELP noc_relay_binds_total Successful binds
# TYPE noc_relay_binds_total counter
noc_relay_binds_total {binds}

# HELP noc_relay_datagrams_forwarded_total Datagrams sent on to a peer
# TYPE noc_relay_datagrams_forwarded_total counter
noc_relay_datagrams_forwarded_total {forwarded}

# HELP noc_relay_datagrams_dropped_total Datagrams not forwarded
# TYPE noc_relay_datagrams_dropped_total counter
noc_relay_datagrams_dropped_total {dropped}

# HELP noc_relay_bytes_forwarded_total Payload bytes sent on to peers
# TYPE noc_relay_bytes_forwarded_total counter
noc_relay_bytes_forwarded_total {bytes}

# HELP noc_relay_sessions_expired_total Sessions removed by the sweep
# TYPE noc_relay_sessions_expired_total counter
noc_relay_sessions_expired_total {expired}

# HELP noc_relay_rate_limit_hits_total Requests rejected by rate limiting
# TYPE noc_relay_rate_limit_hits_total counter
noc_relay_rate_limit_hits_total {rate_limits}
"#,
        version = env!("CARGO_PKG_VERSION"),
    ))
}
