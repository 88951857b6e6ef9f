//! Registry HTTP endpoints.

use super::store::DirectoryError;
use super::validate::{required, room_draft};
use super::{Registry, SERVICE_NAME};
use crate::clock::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::http::{client_ip, prometheus, with_common_layers, JsonBody};
use axum::extract::ConnectInfo;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use hub_types::registry::{
    CloseResponse, HeartbeatResponse, HostRoomsRequest, JoinByCodeRequest, JoinByCodeResponse,
    ListResponse, OpenRoomRequest, OpenRoomResponse, RegistryHealth,
};
use hub_types::RoomId;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

const HOST_ID_MAX: usize = 128;
const JOIN_CODE_MAX: usize = 64;

/// Build the registry router.
pub fn router(registry: Arc<Registry>) -> Router {
    let max_body_bytes = registry.config().http.max_body_bytes;
    let routes = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/world/list", get(list_rooms))
        .route("/world/open", post(open_room))
        .route("/world/heartbeat", post(heartbeat))
        .route("/world/close", post(close_rooms))
        .route("/world/join-by-code", post(join_by_code));

    with_common_layers(routes, max_body_bytes).layer(Extension(registry))
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::RoomsLimitReached { .. } => ApiError::RoomsLimitReached,
        }
    }
}

async fn health(Extension(registry): Extension<Arc<Registry>>) -> Json<RegistryHealth> {
    Json(RegistryHealth {
        ok: true,
        service: SERVICE_NAME.to_string(),
        rooms: registry.rooms().live_count(now_ms()).await,
        ttl_ms: registry.rooms().ttl().as_millis(),
    })
}

async fn list_rooms(Extension(registry): Extension<Arc<Registry>>) -> Json<ListResponse> {
    let servers = registry
        .rooms()
        .live_rooms(now_ms())
        .await
        .iter()
        .map(|room| room.list_view())
        .collect();

    Json(ListResponse { ok: true, servers })
}

async fn open_room(
    Extension(registry): Extension<Arc<Registry>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    JsonBody(req): JsonBody<OpenRoomRequest>,
) -> ApiResult<Json<OpenRoomResponse>> {
    if let Err(e) = registry.rate_limits().check(client_ip(peer)) {
        tracing::warn!("Open rejected: {}", e);
        registry.metrics().rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        return Err(ApiError::RateLimited);
    }

    let draft = room_draft(req)?;
    let host_id = draft.host_id.clone();
    let world_name = draft.world_name.clone();

    let room_id = registry.rooms().open(draft, now_ms()).await.map_err(|e| {
        tracing::info!("Open rejected: {}", e);
        registry
            .metrics()
            .rooms_rejected_total
            .fetch_add(1, Ordering::Relaxed);
        ApiError::from(e)
    })?;

    registry
        .metrics()
        .rooms_opened_total
        .fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        "Room opened: {:?} world={:?} host={:?}",
        room_id,
        world_name,
        host_id
    );

    Ok(Json(OpenRoomResponse { ok: true, room_id }))
}

/// Rooms addressed by a heartbeat or close.
enum Target {
    /// Every room of the host.
    All,
    /// One room, if the host owns it.
    Room(RoomId),
    /// A room id that does not parse and so cannot match anything.
    Nothing,
}

fn host_target(req: &HostRoomsRequest) -> ApiResult<(String, Target)> {
    let host_id = required(req.host_id.as_deref(), HOST_ID_MAX).ok_or(ApiError::HostIdRequired)?;
    let target = match required(req.room_id.as_deref(), usize::MAX) {
        None => Target::All,
        Some(raw) => RoomId::parse(&raw).map_or(Target::Nothing, Target::Room),
    };
    Ok((host_id, target))
}

async fn heartbeat(
    Extension(registry): Extension<Arc<Registry>>,
    JsonBody(req): JsonBody<HostRoomsRequest>,
) -> ApiResult<Json<HeartbeatResponse>> {
    let (host_id, target) = host_target(&req)?;
    let rooms = registry.rooms();

    let updated = match target {
        Target::All => rooms.heartbeat(&host_id, None, now_ms()).await,
        Target::Room(room_id) => rooms.heartbeat(&host_id, Some(room_id), now_ms()).await,
        Target::Nothing => 0,
    };

    registry
        .metrics()
        .heartbeats_total
        .fetch_add(updated as u64, Ordering::Relaxed);
    tracing::debug!("Heartbeat from {:?}: {} room(s) refreshed", host_id, updated);

    Ok(Json(HeartbeatResponse { ok: true, updated }))
}

async fn close_rooms(
    Extension(registry): Extension<Arc<Registry>>,
    JsonBody(req): JsonBody<HostRoomsRequest>,
) -> ApiResult<Json<CloseResponse>> {
    let (host_id, target) = host_target(&req)?;
    let rooms = registry.rooms();

    let removed = match target {
        Target::All => rooms.close(&host_id, None).await,
        Target::Room(room_id) => rooms.close(&host_id, Some(room_id)).await,
        Target::Nothing => 0,
    };

    registry
        .metrics()
        .rooms_closed_total
        .fetch_add(removed as u64, Ordering::Relaxed);
    if removed > 0 {
        tracing::info!("Closed {} room(s) for host {:?}", removed, host_id);
    }

    Ok(Json(CloseResponse { ok: true, removed }))
}

async fn join_by_code(
    Extension(registry): Extension<Arc<Registry>>,
    JsonBody(req): JsonBody<JoinByCodeRequest>,
) -> ApiResult<Json<JoinByCodeResponse>> {
    let code =
        required(req.join_code.as_deref(), JOIN_CODE_MAX).ok_or(ApiError::JoinCodeRequired)?;

    let room = registry
        .rooms()
        .find_by_join_code(&code, now_ms())
        .await
        .ok_or(ApiError::NotFound)?;

    registry.metrics().joins_total.fetch_add(1, Ordering::Relaxed);
    tracing::debug!("Join by code matched {:?}", room.room_id);

    Ok(Json(JoinByCodeResponse {
        ok: true,
        room: room.join_view(),
    }))
}

/// Prometheus metrics handler.
async fn metrics(Extension(registry): Extension<Arc<Registry>>) -> impl IntoResponse {
    let m = registry.metrics();
    let now = now_ms();

    // Gauges
    let live = registry.rooms().live_count(now).await;
    let tracked = registry.rooms().len().await;

    // Counters
    let opened = m.rooms_opened_total.load(Ordering::Relaxed);
    let rejected = m.rooms_rejected_total.load(Ordering::Relaxed);
    let heartbeats = m.heartbeats_total.load(Ordering::Relaxed);
    let closed = m.rooms_closed_total.load(Ordering::Relaxed);
    let expired = m.rooms_expired_total.load(Ordering::Relaxed);
    let joins = m.joins_total.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);

    prometheus(format!(
        r#"# HELP noc_registry_rooms_live Rooms passing the liveness check
# TYPE noc_registry_rooms_live gauge
noc_registry_rooms_live {live}

# HELP noc_registry_rooms_tracked Rooms held in memory, including unswept stale rooms
# TYPE noc_registry_rooms_tracked gauge
noc_registry_rooms_tracked {tracked}

# HELP noc_registry_info Server information
# TYPE noc_registry_info gauge
noc_registry_info{{version="{version}"}} 1

# HELP noc_registry_rooms_opened_total Rooms opened
# TYPE noc_registry_rooms_opened_total counter
noc_registry_rooms_opened_total {opened}

# HELP noc_registry_rooms_rejected_total Opens rejected by the per-host room cap
# TYPE noc_registry_rooms_rejected_total counter
noc_registry_rooms_rejected_total {rejected}

# HELP noc_registry_heartbeats_total Room refreshes from heartbeats
# TYPE noc_registry_heartbeats_total counter
noc_registry_heartbeats_total {heartbeats}

# HELP noc_registry_rooms_closed_total Rooms removed by close
# TYPE noc_registry_rooms_closed_total counter
noc_registry_rooms_closed_total {closed}

# HELP noc_registry_rooms_expired_total Rooms removed by the sweep
# TYPE noc_registry_rooms_expired_total counter
noc_registry_rooms_expired_total {expired}

# HELP noc_registry_joins_total Successful join-by-code lookups
# TYPE noc_registry_joins_total counter
noc_registry_joins_total {joins}

# HELP noc_registry_rate_limit_hits_total Requests rejected by rate limiting
# TYPE noc_registry_rate_limit_hits_total counter
noc_registry_rate_limit_hits_total {rate_limits}
"#,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::Expiring;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use hub_types::ErrorResponse;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn test_registry(config: Config) -> Arc<Registry> {
        Arc::new(Registry::new(config))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(if body.is_null() {
                Body::empty()
            } else {
                Body::from(body.to_string())
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn ok<T: DeserializeOwned>(app: &Router, method: &str, uri: &str, body: Value) -> T {
        let (status, bytes) = send(app, method, uri, body).await;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&bytes));
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn err(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, String) {
        let (status, bytes) = send(app, method, uri, body).await;
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.ok);
        (status, body.error)
    }

    async fn open(app: &Router, body: Value) -> RoomId {
        let resp: OpenRoomResponse = ok(app, "POST", "/world/open", body).await;
        assert!(resp.ok);
        resp.room_id
    }

    #[tokio::test]
    async fn health_reports_live_rooms_and_ttl() {
        let app = router(test_registry(Config::default()));
        open(&app, json!({"hostId": "h1"})).await;

        let health: RegistryHealth = ok(&app, "GET", "/health", Value::Null).await;
        assert!(health.ok);
        assert_eq!(health.service, SERVICE_NAME);
        assert_eq!(health.rooms, 1);
        assert_eq!(health.ttl_ms, 60_000);
    }

    #[tokio::test]
    async fn scenario_open_list_heartbeat() {
        let app = router(test_registry(Config::default()));
        let room_id = open(
            &app,
            json!({"hostId": "h1", "worldName": "Valley", "connect": {"ip": "", "port": 19132}}),
        )
        .await;

        let list: ListResponse = ok(&app, "GET", "/world/list", Value::Null).await;
        assert_eq!(list.servers.len(), 1);
        let room = &list.servers[0];
        assert_eq!(room.room_id, room_id);
        assert_eq!(room.world_name, "Valley");
        assert_eq!(room.connect.ip, "");
        assert!(room.connect.is_hidden());
        assert_eq!(room.connect.port, 19132);

        for _ in 0..3 {
            let hb: HeartbeatResponse = ok(
                &app,
                "POST",
                "/world/heartbeat",
                json!({"hostId": "h1", "roomId": room_id}),
            )
            .await;
            assert_eq!(hb.updated, 1);
        }
    }

    #[tokio::test]
    async fn stale_room_leaves_listing_but_can_be_closed() {
        let mut config = Config::default();
        config.registry.room_ttl_ms = 0;
        let registry = test_registry(config);
        let app = router(registry.clone());

        let room_id = open(&app, json!({"hostId": "h1"})).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let list: ListResponse = ok(&app, "GET", "/world/list", Value::Null).await;
        assert!(list.servers.is_empty());

        let closed: CloseResponse = ok(
            &app,
            "POST",
            "/world/close",
            json!({"hostId": "h1", "roomId": room_id}),
        )
        .await;
        assert_eq!(closed.removed, 1);
        assert_eq!(registry.sweep_expired(now_ms()).await, 0);
    }

    #[tokio::test]
    async fn open_validation_errors() {
        let app = router(test_registry(Config::default()));

        assert_eq!(
            err(&app, "POST", "/world/open", json!({"worldName": "x"})).await,
            (StatusCode::BAD_REQUEST, "hostId_required".to_string())
        );
        assert_eq!(
            err(
                &app,
                "POST",
                "/world/open",
                json!({"hostId": "h1", "connect": {"port": 99999}})
            )
            .await,
            (StatusCode::BAD_REQUEST, "invalid_port".to_string())
        );
        assert_eq!(
            err(&app, "POST", "/world/open", json!({"hostId": ["h1"]})).await,
            (StatusCode::BAD_REQUEST, "invalid_json".to_string())
        );
    }

    #[tokio::test]
    async fn open_normalises_loose_numeric_fields() {
        let app = router(test_registry(Config::default()));

        for port in [json!("abc"), json!(1.5), json!(true)] {
            assert_eq!(
                err(
                    &app,
                    "POST",
                    "/world/open",
                    json!({"hostId": "h1", "connect": {"port": port}})
                )
                .await,
                (StatusCode::BAD_REQUEST, "invalid_port".to_string())
            );
        }

        open(
            &app,
            json!({"hostId": "h1", "connect": {"port": "19133"}, "maxPlayers": 1e12}),
        )
        .await;
        open(&app, json!({"hostId": "h1", "maxPlayers": 5.5})).await;

        let list: ListResponse = ok(&app, "GET", "/world/list", Value::Null).await;
        let mut caps: Vec<(u16, u8)> = list
            .servers
            .iter()
            .map(|r| (r.connect.port, r.max_players))
            .collect();
        caps.sort();
        assert_eq!(caps, vec![(19132, 5), (19133, 100)]);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = router(test_registry(Config::default()));
        let request = Request::builder()
            .method("POST")
            .uri("/world/open")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn room_cap_returns_429() {
        let mut config = Config::default();
        config.registry.max_rooms_per_host = 2;
        let app = router(test_registry(config));

        open(&app, json!({"hostId": "h1"})).await;
        open(&app, json!({"hostId": "h1"})).await;
        assert_eq!(
            err(&app, "POST", "/world/open", json!({"hostId": "h1"})).await,
            (
                StatusCode::TOO_MANY_REQUESTS,
                "rooms_limit_reached".to_string()
            )
        );
        open(&app, json!({"hostId": "h2"})).await;
    }

    #[tokio::test]
    async fn foreign_heartbeat_returns_zero() {
        let app = router(test_registry(Config::default()));
        let room_id = open(&app, json!({"hostId": "h1"})).await;

        let hb: HeartbeatResponse = ok(
            &app,
            "POST",
            "/world/heartbeat",
            json!({"hostId": "h2", "roomId": room_id}),
        )
        .await;
        assert_eq!(hb.updated, 0);

        let hb: HeartbeatResponse = ok(
            &app,
            "POST",
            "/world/heartbeat",
            json!({"hostId": "h1", "roomId": "garbage"}),
        )
        .await;
        assert_eq!(hb.updated, 0);
    }

    #[tokio::test]
    async fn bulk_heartbeat_and_close() {
        let app = router(test_registry(Config::default()));
        open(&app, json!({"hostId": "h1"})).await;
        open(&app, json!({"hostId": "h1"})).await;
        open(&app, json!({"hostId": "h2"})).await;

        let hb: HeartbeatResponse =
            ok(&app, "POST", "/world/heartbeat", json!({"hostId": "h1"})).await;
        assert_eq!(hb.updated, 2);

        let closed: CloseResponse =
            ok(&app, "POST", "/world/close", json!({"hostId": "h1", "roomId": ""})).await;
        assert_eq!(closed.removed, 2);

        let list: ListResponse = ok(&app, "GET", "/world/list", Value::Null).await;
        assert_eq!(list.servers.len(), 1);
        assert_eq!(list.servers[0].host_id, "h2");
    }

    #[tokio::test]
    async fn heartbeat_and_close_require_host() {
        let app = router(test_registry(Config::default()));
        assert_eq!(
            err(&app, "POST", "/world/heartbeat", Value::Null).await,
            (StatusCode::BAD_REQUEST, "hostId_required".to_string())
        );
        assert_eq!(
            err(&app, "POST", "/world/close", json!({"hostId": " "})).await,
            (StatusCode::BAD_REQUEST, "hostId_required".to_string())
        );
    }

    #[tokio::test]
    async fn join_by_code_never_returns_the_code() {
        let app = router(test_registry(Config::default()));
        let room_id = open(
            &app,
            json!({
                "hostId": "h1",
                "worldName": "Secret Base",
                "isPrivate": true,
                "joinCode": "OAK-7731",
                "connect": {"ip": "203.0.113.9", "port": 19133}
            }),
        )
        .await;

        // Private rooms are listed with their address withheld.
        let list: ListResponse = ok(&app, "GET", "/world/list", Value::Null).await;
        assert_eq!(list.servers[0].connect.ip, "");

        let (status, bytes) = send(
            &app,
            "POST",
            "/world/join-by-code",
            json!({"joinCode": "OAK-7731"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let raw = String::from_utf8(bytes.clone()).unwrap();
        assert!(!raw.contains("OAK-7731"));
        assert!(!raw.contains("joinCode"));
        assert!(!raw.contains("lastHeartbeatAt"));

        let joined: JoinByCodeResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(joined.room.room_id, room_id);
        assert_eq!(joined.room.connect.ip, "203.0.113.9");
        assert_eq!(joined.room.connect.port, 19133);
    }

    #[tokio::test]
    async fn join_by_code_errors() {
        let app = router(test_registry(Config::default()));
        assert_eq!(
            err(&app, "POST", "/world/join-by-code", json!({"joinCode": "NOPE"})).await,
            (StatusCode::NOT_FOUND, "not_found".to_string())
        );
        assert_eq!(
            err(&app, "POST", "/world/join-by-code", json!({})).await,
            (StatusCode::BAD_REQUEST, "joinCode_required".to_string())
        );
    }

    #[tokio::test]
    async fn open_is_rate_limited() {
        let mut config = Config::default();
        config.limits.global_requests_per_second = 2;
        let registry = test_registry(config);
        let app = router(registry.clone());

        open(&app, json!({"hostId": "a"})).await;
        open(&app, json!({"hostId": "b"})).await;
        assert_eq!(
            err(&app, "POST", "/world/open", json!({"hostId": "c"})).await,
            (StatusCode::TOO_MANY_REQUESTS, "rate_limited".to_string())
        );
        assert_eq!(
            registry.metrics().rate_limit_hits.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn unknown_route_and_wrong_method() {
        let app = router(test_registry(Config::default()));
        assert_eq!(
            err(&app, "GET", "/world/unknown", Value::Null).await,
            (StatusCode::NOT_FOUND, "not_found".to_string())
        );
        let (status, _) = send(&app, "GET", "/world/open", Value::Null).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_counters() {
        let app = router(test_registry(Config::default()));
        open(&app, json!({"hostId": "h1"})).await;

        let (status, bytes) = send(&app, "GET", "/metrics", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("noc_registry_rooms_opened_total 1"));
        assert!(text.contains("noc_registry_rooms_live 1"));
    }
}
