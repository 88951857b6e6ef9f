//! # hub-types
//!
//! Wire types for the NocHub rendezvous services.
//!
//! Shared by the room registry, the session relay and their HTTP clients:
//! - [`RoomId`], [`SessionId`], [`Token`] - Identity and credential types
//! - [`Role`] - Which side of a relay session an endpoint belongs to
//! - [`registry`] - Room registry request and response bodies
//! - [`relay`] - Session relay request and response bodies
//! - [`HubTypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod role;

pub mod registry;
pub mod relay;

pub use error::HubTypesError;
pub use ids::{RoomId, SessionId, Token, TOKEN_LEN};
pub use role::Role;

use serde::{Deserialize, Serialize};

/// Body returned with every non-2xx response from either service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub ok: bool,
    /// Short machine-readable code, e.g. `hostId_required`.
    pub error: String,
}

impl ErrorResponse {
    /// Build an error body for a code.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: code.into(),
        }
    }
}
