//! Session table and routing index.
//!
//! Sessions and the address → (session, role) index live behind one lock so
//! a rebind can retire the old route and install the new one atomically.
//! Every route agrees with the endpoint currently recorded for its role.

use crate::clock::Ttl;
use hub_types::relay::SessionStatus;
use hub_types::{Role, SessionId, Token};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::RwLock;

/// A rendezvous record pairing a host and a player.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier.
    pub session_id: SessionId,
    /// Room the session was created for.
    pub room_id: String,
    /// Credential for the host role.
    pub host_token: Token,
    /// Credential for the player role.
    pub player_token: Token,
    /// Bound host endpoint.
    pub host: Option<SocketAddr>,
    /// Bound player endpoint.
    pub player: Option<SocketAddr>,
    /// Unix milliseconds at creation.
    pub created_at: u64,
    /// Unix milliseconds of the last bind or forwarded datagram.
    pub last_seen: u64,
}

impl Session {
    /// Endpoint bound for `role`.
    pub fn endpoint(&self, role: Role) -> Option<SocketAddr> {
        match role {
            Role::Host => self.host,
            Role::Player => self.player,
        }
    }

    fn endpoint_mut(&mut self, role: Role) -> &mut Option<SocketAddr> {
        match role {
            Role::Host => &mut self.host,
            Role::Player => &mut self.player,
        }
    }

    /// Token issued for `role`.
    pub fn token(&self, role: Role) -> &Token {
        match role {
            Role::Host => &self.host_token,
            Role::Player => &self.player_token,
        }
    }

    /// Both roles bound.
    pub fn is_ready(&self) -> bool {
        self.host.is_some() && self.player.is_some()
    }

    /// Wire view of the session.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id,
            room_id: self.room_id.clone(),
            ready: self.is_ready(),
            last_seen: self.last_seen,
            created_at: self.created_at,
        }
    }
}

/// Owner of a routed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Route {
    session_id: SessionId,
    role: Role,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, Session>,
    routes: HashMap<SocketAddr, Route>,
}

/// Bind failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// No live session with that id.
    #[error("session not found")]
    SessionNotFound,
    /// Token missing or not the role's token.
    #[error("invalid token for role")]
    InvalidToken,
}

/// Why a datagram was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    /// Source address has no routing entry.
    #[error("unknown sender")]
    UnknownSender,
    /// The owning session has passed its TTL.
    #[error("session expired")]
    SessionExpired,
    /// The other role has not bound yet.
    #[error("peer not bound")]
    PeerUnbound,
}

/// All relay sessions plus the forwarding index.
#[derive(Debug)]
pub struct SessionTable {
    inner: RwLock<Inner>,
    ttl: Ttl,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new(ttl: Ttl) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            ttl,
        }
    }

    /// The session TTL.
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Create a session with fresh tokens and no endpoints.
    pub async fn create(&self, room_id: String, now: u64) -> Session {
        let mut inner = self.inner.write().await;

        let mut session_id = SessionId::new();
        while inner.sessions.contains_key(&session_id) {
            session_id = SessionId::new();
        }

        let host_token = Token::mint();
        let player_token = Token::mint_distinct(&host_token);
        let session = Session {
            session_id,
            room_id,
            host_token,
            player_token,
            host: None,
            player: None,
            created_at: now,
            last_seen: now,
        };
        inner.sessions.insert(session_id, session.clone());
        session
    }

    /// Bind `role` of a session to `endpoint` and return whether the session
    /// is ready.
    ///
    /// A supplied token must be the role's token; `require_token` makes it
    /// mandatory. The role's previous route is retired. If another session
    /// or role owned `endpoint`, that owner loses its endpoint.
    pub async fn bind(
        &self,
        session_id: SessionId,
        role: Role,
        endpoint: SocketAddr,
        token: Option<&str>,
        require_token: bool,
        now: u64,
    ) -> Result<bool, BindError> {
        let mut guard = self.inner.write().await;
        let Inner { sessions, routes } = &mut *guard;

        let previous = {
            let session = sessions
                .get(&session_id)
                .filter(|s| self.ttl.is_live(s.last_seen, now))
                .ok_or(BindError::SessionNotFound)?;

            match token {
                Some(presented) if !session.token(role).matches(presented) => {
                    return Err(BindError::InvalidToken)
                }
                None if require_token => return Err(BindError::InvalidToken),
                _ => {}
            }
            session.endpoint(role)
        };

        let route = Route { session_id, role };

        if let Some(prev) = previous {
            if routes.get(&prev) == Some(&route) {
                routes.remove(&prev);
            }
        }

        if let Some(displaced) = routes.insert(endpoint, route) {
            if displaced != route {
                if let Some(owner) = sessions.get_mut(&displaced.session_id) {
                    let slot = owner.endpoint_mut(displaced.role);
                    if *slot == Some(endpoint) {
                        *slot = None;
                    }
                }
                tracing::debug!(
                    "Endpoint {} moved from {:?}/{} to {:?}/{}",
                    endpoint,
                    displaced.session_id,
                    displaced.role,
                    session_id,
                    role
                );
            }
        }

        let session = sessions
            .get_mut(&session_id)
            .ok_or(BindError::SessionNotFound)?;
        *session.endpoint_mut(role) = Some(endpoint);
        session.last_seen = now;
        Ok(session.is_ready())
    }

    /// Snapshot of a live session.
    pub async fn status(&self, session_id: SessionId, now: u64) -> Option<SessionStatus> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(&session_id)
            .filter(|s| self.ttl.is_live(s.last_seen, now))
            .map(Session::status)
    }

    /// Where a datagram from `from` should go.
    ///
    /// A successful lookup refreshes the session.
    pub async fn resolve(&self, from: SocketAddr, now: u64) -> Result<SocketAddr, DropReason> {
        let mut guard = self.inner.write().await;
        let Inner { sessions, routes } = &mut *guard;

        let route = routes.get(&from).ok_or(DropReason::UnknownSender)?;
        let session = sessions
            .get_mut(&route.session_id)
            .ok_or(DropReason::UnknownSender)?;

        if !self.ttl.is_live(session.last_seen, now) {
            return Err(DropReason::SessionExpired);
        }
        session.last_seen = now;

        session
            .endpoint(route.role.peer())
            .ok_or(DropReason::PeerUnbound)
    }

    /// Remove sessions past the TTL along with their routes. Returns the
    /// number of sessions removed.
    pub async fn sweep_expired(&self, now: u64) -> usize {
        let mut guard = self.inner.write().await;
        let Inner { sessions, routes } = &mut *guard;

        let before = sessions.len();
        sessions.retain(|_, s| self.ttl.is_live(s.last_seen, now));
        routes.retain(|_, r| sessions.contains_key(&r.session_id));
        before - sessions.len()
    }

    /// Number of sessions passing the liveness check.
    pub async fn live_count(&self, now: u64) -> usize {
        let inner = self.inner.read().await;
        inner
            .sessions
            .values()
            .filter(|s| self.ttl.is_live(s.last_seen, now))
            .count()
    }

    /// Number of tracked sessions, live or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Whether no sessions are tracked.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }

    /// Number of routing entries.
    pub async fn route_count(&self) -> usize {
        self.inner.read().await.routes.len()
    }
}
