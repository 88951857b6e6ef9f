//! Session relay request and response bodies.

use crate::{SessionId, Token};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /session/create`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Room the session belongs to. Required.
    #[serde(default)]
    pub room_id: Option<String>,
    /// Host name clients should send datagrams to, if the caller knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_relay_host: Option<String>,
}

/// Where clients should send their datagrams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayAddress {
    /// Public host of the relay, `null` when unknown.
    pub host: Option<String>,
    /// UDP port of the forwarder.
    pub udp_port: u16,
}

/// Response to `POST /session/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Always `true`.
    pub ok: bool,
    /// New session identifier.
    pub session_id: SessionId,
    /// Forwarder address.
    pub relay: RelayAddress,
    /// Credential for the host side.
    pub host_token: Token,
    /// Credential for the player side.
    pub player_token: Token,
}

/// `POST /session/bind`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindRequest {
    /// Session to bind into.
    #[serde(default)]
    pub session_id: Option<String>,
    /// `host` or `player`.
    #[serde(default)]
    pub role: Option<String>,
    /// Observable IP address of the caller.
    #[serde(default)]
    pub address: Option<String>,
    /// Observable UDP port of the caller, as a number or numeric string.
    #[serde(default)]
    pub port: Option<Value>,
    /// Role token from the create response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Response to `POST /session/bind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindResponse {
    /// Always `true`.
    pub ok: bool,
    /// Whether both roles are now bound.
    pub ready: bool,
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Session identifier.
    pub session_id: SessionId,
    /// Room the session belongs to.
    pub room_id: String,
    /// Whether both roles are bound.
    pub ready: bool,
    /// Unix milliseconds of the last bind or forwarded datagram.
    pub last_seen: u64,
    /// Unix milliseconds when the session was created.
    pub created_at: u64,
}

/// Response to `GET /session/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    /// Always `true`.
    pub ok: bool,
    /// The session.
    pub session: SessionStatus,
}

/// Response to the relay's `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayHealth {
    /// Always `true`.
    pub ok: bool,
    /// Service name.
    pub service: String,
    /// Number of tracked sessions.
    pub sessions: usize,
    /// UDP port of the forwarder.
    pub udp_port: u16,
}
