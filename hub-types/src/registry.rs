//! Room registry request and response bodies.
//!
//! Request fields are optional on the wire; the registry applies defaults and
//! validation. Responses always carry `ok: true`.

use crate::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `connect` block of an open request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// Connection kind, e.g. `direct` or `relay`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Address players should connect to. Empty means "address hidden".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Game port. Kept as raw JSON so numeric strings and out-of-range
    /// values reach validation instead of failing the whole body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Value>,
}

/// `POST /world/open`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRoomRequest {
    /// Stable identifier of the hosting client. Required.
    #[serde(default)]
    pub host_id: Option<String>,
    /// Display name of the host.
    #[serde(default)]
    pub host_name: Option<String>,
    /// Name of the advertised world.
    #[serde(default)]
    pub world_name: Option<String>,
    /// Game version string.
    #[serde(default)]
    pub game_version: Option<String>,
    /// Game mode, e.g. `survival`.
    #[serde(default)]
    pub mode: Option<String>,
    /// How to reach the world.
    #[serde(default)]
    pub connect: Option<ConnectRequest>,
    /// Whether the room is unlisted except through its join code.
    #[serde(default)]
    pub is_private: Option<bool>,
    /// Optional code for join-by-code lookups.
    #[serde(default)]
    pub join_code: Option<String>,
    /// Player cap, clamped to 1..=100. Raw JSON, like `ConnectRequest::port`.
    #[serde(default)]
    pub max_players: Option<Value>,
}

/// Response to `POST /world/open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRoomResponse {
    /// Always `true`.
    pub ok: bool,
    /// Identifier allocated for the room.
    pub room_id: RoomId,
}

/// Body of `POST /world/heartbeat` and `POST /world/close`.
///
/// Without `room_id` the operation applies to every room owned by `host_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRoomsRequest {
    /// Owner of the rooms. Required.
    #[serde(default)]
    pub host_id: Option<String>,
    /// A single room to target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

/// Response to `POST /world/heartbeat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    /// Always `true`.
    pub ok: bool,
    /// Number of rooms refreshed.
    pub updated: usize,
}

/// Response to `POST /world/close`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseResponse {
    /// Always `true`.
    pub ok: bool,
    /// Number of rooms removed.
    pub removed: usize,
}

/// `POST /world/join-by-code`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinByCodeRequest {
    /// The join code to look up.
    #[serde(default)]
    pub join_code: Option<String>,
}

/// Connection details of a stored room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    /// Connection kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Address, empty when hidden.
    pub ip: String,
    /// Game port.
    pub port: u16,
}

impl Connect {
    /// Whether the address is withheld, making the entry a non-joinable placeholder.
    pub fn is_hidden(&self) -> bool {
        self.ip.is_empty()
    }
}

/// A room as it appears in `GET /world/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    /// Room identifier.
    pub room_id: RoomId,
    /// Owner of the room.
    pub host_id: String,
    /// Display name of the host.
    pub host_name: String,
    /// World name.
    pub world_name: String,
    /// Game version.
    pub game_version: String,
    /// Game mode.
    pub mode: String,
    /// How to reach the world.
    pub connect: Connect,
    /// Whether the room is private.
    pub is_private: bool,
    /// Player cap.
    pub max_players: u8,
    /// Unix milliseconds when the room was opened.
    pub created_at: u64,
    /// Unix milliseconds of the last heartbeat.
    pub last_heartbeat_at: u64,
}

/// Response to `GET /world/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    /// Always `true`.
    pub ok: bool,
    /// Live rooms.
    pub servers: Vec<RoomView>,
}

/// A room as returned by join-by-code. Never carries the code or timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinView {
    /// Room identifier.
    pub room_id: RoomId,
    /// Display name of the host.
    pub host_name: String,
    /// World name.
    pub world_name: String,
    /// Game version.
    pub game_version: String,
    /// Game mode.
    pub mode: String,
    /// How to reach the world.
    pub connect: Connect,
    /// Whether the room is private.
    pub is_private: bool,
}

/// Response to `POST /world/join-by-code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinByCodeResponse {
    /// Always `true`.
    pub ok: bool,
    /// The matched room.
    pub room: JoinView,
}

/// Response to the registry's `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryHealth {
    /// Always `true`.
    pub ok: bool,
    /// Service name.
    pub service: String,
    /// Number of live rooms.
    pub rooms: usize,
    /// Room time-to-live in milliseconds.
    pub ttl_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_request_accepts_partial_body() {
        let req: OpenRoomRequest = serde_json::from_str(
            r#"{"hostId":"h1","worldName":"Valley","connect":{"ip":"","port":19132}}"#,
        )
        .unwrap();
        assert_eq!(req.host_id.as_deref(), Some("h1"));
        assert_eq!(req.world_name.as_deref(), Some("Valley"));
        let connect = req.connect.unwrap();
        assert_eq!(connect.ip.as_deref(), Some(""));
        assert_eq!(connect.port, Some(Value::from(19132)));
        assert_eq!(connect.kind, None);
        assert_eq!(req.max_players, None);
    }

    #[test]
    fn numeric_fields_accept_any_json_shape() {
        let req: OpenRoomRequest = serde_json::from_str(
            r#"{"hostId":"h1","connect":{"port":"abc"},"maxPlayers":5.5}"#,
        )
        .unwrap();
        assert_eq!(req.connect.unwrap().port, Some(Value::from("abc")));
        assert_eq!(req.max_players, Some(Value::from(5.5)));

        let req: OpenRoomRequest =
            serde_json::from_str(r#"{"connect":{"port":null},"maxPlayers":null}"#).unwrap();
        assert_eq!(req.connect.unwrap().port, None);
        assert_eq!(req.max_players, None);
    }

    #[test]
    fn connect_uses_type_key() {
        let connect = Connect {
            kind: "direct".to_string(),
            ip: String::new(),
            port: 19132,
        };
        let json = serde_json::to_string(&connect).unwrap();
        assert_eq!(json, r#"{"type":"direct","ip":"","port":19132}"#);
        assert!(connect.is_hidden());
    }

    #[test]
    fn join_view_has_no_code_field() {
        let view = JoinView {
            room_id: RoomId::new(),
            host_name: "Host".to_string(),
            world_name: "Valley".to_string(),
            game_version: String::new(),
            mode: "survival".to_string(),
            connect: Connect {
                kind: "direct".to_string(),
                ip: "10.0.0.2".to_string(),
                port: 19132,
            },
            is_private: true,
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("joinCode"));
        assert!(!json.contains("createdAt"));
        assert!(json.contains("\"isPrivate\":true"));
    }
}
