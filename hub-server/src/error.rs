//! Error types for the registry and relay services.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hub_types::ErrorResponse;
use std::net::SocketAddr;

/// Errors answered to HTTP callers.
///
/// Each variant maps to a status code and a short machine-readable code sent
/// as `{"ok": false, "error": <code>}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Open/heartbeat/close without a host id.
    #[error("hostId_required")]
    HostIdRequired,

    /// Port that is not a whole number in 1..=65535.
    #[error("invalid_port")]
    InvalidPort,

    /// Join-by-code without a code.
    #[error("joinCode_required")]
    JoinCodeRequired,

    /// Session create without a room id.
    #[error("roomId_required")]
    RoomIdRequired,

    /// Status lookup without a session id.
    #[error("sessionId_required")]
    SessionIdRequired,

    /// Bind missing one of sessionId, role, address or port.
    #[error("session_bind_fields_required")]
    BindFieldsRequired,

    /// Bind role other than `host` or `player`.
    #[error("invalid_role")]
    InvalidRole,

    /// Bind address is not an IP literal.
    #[error("invalid_address")]
    InvalidAddress,

    /// Bind token does not match the role.
    #[error("invalid_token")]
    InvalidToken,

    /// Request body is not valid JSON for the endpoint.
    #[error("invalid_json")]
    InvalidJson,

    /// Request query string could not be decoded.
    #[error("invalid_query")]
    InvalidQuery,

    /// Request body exceeds the configured limit.
    #[error("payload_too_large")]
    PayloadTooLarge,

    /// Host already owns the maximum number of tracked rooms.
    #[error("rooms_limit_reached")]
    RoomsLimitReached,

    /// Caller exceeded the request rate.
    #[error("rate_limited")]
    RateLimited,

    /// Unknown route or room.
    #[error("not_found")]
    NotFound,

    /// Unknown or expired session.
    #[error("session_not_found")]
    SessionNotFound,

    /// A handler failed unexpectedly.
    #[error("internal_error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::RoomsLimitReached | Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidToken => StatusCode::FORBIDDEN,
            // Unexpected failures are reported as a bad request with the message.
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Fatal errors while starting a service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Listen address could not be resolved.
    #[error("invalid listen address {host}:{port}")]
    InvalidAddress {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },

    /// Socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was being bound.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HTTP handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_format() {
        assert_eq!(ApiError::HostIdRequired.to_string(), "hostId_required");
        assert_eq!(ApiError::RoomsLimitReached.to_string(), "rooms_limit_reached");
        assert_eq!(
            ApiError::BindFieldsRequired.to_string(),
            "session_bind_fields_required"
        );
        assert_eq!(
            ApiError::Internal("boom".into()).to_string(),
            "internal_error: boom"
        );
    }

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(ApiError::InvalidPort.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PayloadTooLarge.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::SessionNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::RoomsLimitReached.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
        assert_send_sync::<ServiceError>();
    }
}
