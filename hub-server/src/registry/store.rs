//! In-memory room directory.
//!
//! Rooms live in a single map behind a `tokio::sync::RwLock`. Each mutation
//! touches one room (or the rooms of one host) under the write lock, so
//! concurrent opens, heartbeats and sweeps never interleave mid-update.

use crate::clock::Ttl;
use hub_types::registry::{Connect, JoinView, RoomView};
use hub_types::RoomId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Validated fields of an open request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDraft {
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
    /// Code for join-by-code lookups.
    pub join_code: Option<String>,
    /// Player cap, 1..=100.
    pub max_players: u8,
}

/// A tracked room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Server-assigned identifier.
    pub room_id: RoomId,
    /// Fields supplied by the host.
    pub draft: RoomDraft,
    /// Unix milliseconds when the room was opened.
    pub created_at: u64,
    /// Unix milliseconds of the last heartbeat.
    pub last_heartbeat_at: u64,
}

impl Room {
    /// Listing view. Private rooms have their address withheld; the join code
    /// is the only way to learn it.
    pub fn list_view(&self) -> RoomView {
        let mut connect = self.draft.connect.clone();
        if self.draft.is_private {
            connect.ip.clear();
        }

        RoomView {
            room_id: self.room_id,
            host_id: self.draft.host_id.clone(),
            host_name: self.draft.host_name.clone(),
            world_name: self.draft.world_name.clone(),
            game_version: self.draft.game_version.clone(),
            mode: self.draft.mode.clone(),
            connect,
            is_private: self.draft.is_private,
            max_players: self.draft.max_players,
            created_at: self.created_at,
            last_heartbeat_at: self.last_heartbeat_at,
        }
    }

    /// Join-by-code view, without the code or timestamps.
    pub fn join_view(&self) -> JoinView {
        JoinView {
            room_id: self.room_id,
            host_name: self.draft.host_name.clone(),
            world_name: self.draft.world_name.clone(),
            game_version: self.draft.game_version.clone(),
            mode: self.draft.mode.clone(),
            connect: self.draft.connect.clone(),
            is_private: self.draft.is_private,
        }
    }

    fn owned_by(&self, host_id: &str) -> bool {
        self.draft.host_id == host_id
    }
}

/// Room directory errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Host already owns the maximum number of tracked rooms.
    #[error("room limit reached for host {host_id} (limit: {limit})")]
    RoomsLimitReached {
        /// The host.
        host_id: String,
        /// The configured cap.
        limit: usize,
    },
}

/// Map of room id to room with heartbeat liveness.
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<RoomId, Room>>,
    ttl: Ttl,
    max_rooms_per_host: usize,
}

impl RoomDirectory {
    /// Create an empty directory.
    pub fn new(ttl: Ttl, max_rooms_per_host: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            ttl,
            max_rooms_per_host,
        }
    }

    /// The room TTL.
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Store a new room and return its id.
    ///
    /// The per-host count includes stale rooms the sweep has not reaped yet.
    pub async fn open(&self, draft: RoomDraft, now: u64) -> Result<RoomId, DirectoryError> {
        let mut rooms = self.rooms.write().await;

        let owned = rooms.values().filter(|r| r.owned_by(&draft.host_id)).count();
        if owned >= self.max_rooms_per_host {
            return Err(DirectoryError::RoomsLimitReached {
                host_id: draft.host_id,
                limit: self.max_rooms_per_host,
            });
        }

        let mut room_id = RoomId::new();
        while rooms.contains_key(&room_id) {
            room_id = RoomId::new();
        }

        rooms.insert(
            room_id,
            Room {
                room_id,
                draft,
                created_at: now,
                last_heartbeat_at: now,
            },
        );
        Ok(room_id)
    }

    /// Live rooms, oldest first.
    pub async fn live_rooms(&self, now: u64) -> Vec<Room> {
        let rooms = self.rooms.read().await;
        let mut live: Vec<Room> = rooms
            .values()
            .filter(|r| self.ttl.is_live(r.last_heartbeat_at, now))
            .cloned()
            .collect();
        live.sort_by_key(|r| (r.created_at, r.room_id.to_string()));
        live
    }

    /// Number of live rooms.
    pub async fn live_count(&self, now: u64) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .values()
            .filter(|r| self.ttl.is_live(r.last_heartbeat_at, now))
            .count()
    }

    /// Number of tracked rooms, live or not.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Whether no rooms are tracked.
    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Refresh one owned room, or every room of `host_id` when `room_id` is `None`.
    ///
    /// Returns the number of rooms refreshed. A room owned by someone else or
    /// not present counts as zero.
    pub async fn heartbeat(&self, host_id: &str, room_id: Option<RoomId>, now: u64) -> usize {
        let mut rooms = self.rooms.write().await;

        match room_id {
            Some(room_id) => match rooms.get_mut(&room_id) {
                Some(room) if room.owned_by(host_id) => {
                    room.last_heartbeat_at = now;
                    1
                }
                _ => 0,
            },
            None => {
                let mut updated = 0;
                for room in rooms.values_mut().filter(|r| r.owned_by(host_id)) {
                    room.last_heartbeat_at = now;
                    updated += 1;
                }
                updated
            }
        }
    }

    /// Remove one owned room, or every room of `host_id` when `room_id` is `None`.
    ///
    /// Liveness does not matter: stale rooms can still be closed.
    pub async fn close(&self, host_id: &str, room_id: Option<RoomId>) -> usize {
        let mut rooms = self.rooms.write().await;

        match room_id {
            Some(room_id) => {
                if rooms.get(&room_id).is_some_and(|r| r.owned_by(host_id)) {
                    rooms.remove(&room_id);
                    1
                } else {
                    0
                }
            }
            None => {
                let before = rooms.len();
                rooms.retain(|_, r| !r.owned_by(host_id));
                before - rooms.len()
            }
        }
    }

    /// Find a live room by exact join code.
    ///
    /// When several live rooms share the code, the most recently refreshed wins.
    pub async fn find_by_join_code(&self, code: &str, now: u64) -> Option<Room> {
        let rooms = self.rooms.read().await;
        rooms
            .values()
            .filter(|r| r.draft.join_code.as_deref() == Some(code))
            .filter(|r| self.ttl.is_live(r.last_heartbeat_at, now))
            .max_by_key(|r| (r.last_heartbeat_at, r.created_at))
            .cloned()
    }

    /// Remove rooms past the TTL. Returns the number removed.
    pub async fn sweep_expired(&self, now: u64) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|_, r| self.ttl.is_live(r.last_heartbeat_at, now));
        before - rooms.len()
    }
}
