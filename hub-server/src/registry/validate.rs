//! Validation and normalisation of open requests.

use super::store::RoomDraft;
use crate::error::ApiError;
use crate::http::json_number;
use hub_types::registry::{Connect, OpenRoomRequest};
use serde_json::Value;

/// Port used when the request names none.
pub const DEFAULT_GAME_PORT: u16 = 19132;
/// Player cap used when the request names none.
pub const DEFAULT_MAX_PLAYERS: u8 = 10;
/// Largest accepted player cap.
pub const MAX_PLAYERS_CAP: u8 = 100;

const HOST_ID_MAX: usize = 128;
const HOST_NAME_MAX: usize = 40;
const WORLD_NAME_MAX: usize = 80;
const GAME_VERSION_MAX: usize = 24;
const MODE_MAX: usize = 24;
const CONNECT_TYPE_MAX: usize = 24;
const IP_MAX: usize = 128;
const JOIN_CODE_MAX: usize = 64;

/// Turn an open request into a draft, applying defaults and caps.
pub fn room_draft(req: OpenRoomRequest) -> Result<RoomDraft, ApiError> {
    let host_id = required(req.host_id.as_deref(), HOST_ID_MAX).ok_or(ApiError::HostIdRequired)?;

    let connect = req.connect.unwrap_or_default();
    let port = game_port(connect.port.as_ref())?;

    Ok(RoomDraft {
        host_id,
        host_name: text_or(req.host_name.as_deref(), "Host", HOST_NAME_MAX),
        world_name: text_or(req.world_name.as_deref(), "Bedrock world", WORLD_NAME_MAX),
        game_version: text_or(req.game_version.as_deref(), "", GAME_VERSION_MAX),
        mode: text_or(req.mode.as_deref(), "survival", MODE_MAX),
        connect: Connect {
            kind: text_or(connect.kind.as_deref(), "direct", CONNECT_TYPE_MAX),
            ip: text_or(connect.ip.as_deref(), "", IP_MAX),
            port,
        },
        is_private: req.is_private.unwrap_or(false),
        join_code: required(req.join_code.as_deref(), JOIN_CODE_MAX),
        max_players: max_players(req.max_players.as_ref()),
    })
}

/// Validate a port number. Missing, zero or blank selects `DEFAULT_GAME_PORT`.
///
/// Numeric strings are accepted. Anything that is not a whole number in
/// 1..=65535 is `InvalidPort`.
pub fn game_port(port: Option<&Value>) -> Result<u16, ApiError> {
    let Some(value) = port else {
        return Ok(DEFAULT_GAME_PORT);
    };

    match json_number(value) {
        Some(p) if p == 0.0 => Ok(DEFAULT_GAME_PORT),
        Some(p) if p.fract() == 0.0 && (1.0..=65535.0).contains(&p) => Ok(p as u16),
        _ => Err(ApiError::InvalidPort),
    }
}

/// Clamp a player cap into 1..=100, dropping any fraction.
///
/// Missing, zero or non-numeric values select the default.
pub fn max_players(value: Option<&Value>) -> u8 {
    match value.and_then(json_number).map(f64::trunc) {
        None => DEFAULT_MAX_PLAYERS,
        Some(v) if v == 0.0 => DEFAULT_MAX_PLAYERS,
        Some(v) => v.clamp(1.0, f64::from(MAX_PLAYERS_CAP)) as u8,
    }
}

/// Trimmed, capped text; `None` when absent or blank.
pub fn required(value: Option<&str>, max_chars: usize) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| truncate(v, max_chars))
}

fn text_or(value: Option<&str>, default: &str, max_chars: usize) -> String {
    required(value, max_chars).unwrap_or_else(|| default.to_string())
}

/// Truncate to a maximum character count without splitting UTF-8 sequences.
fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        value.chars().take(max_chars).collect()
    }
}
