//! Error types for NocHub wire types.

use thiserror::Error;

/// Errors produced while interpreting wire values.
#[derive(Debug, Error)]
pub enum HubTypesError {
    /// Role name was neither `host` nor `player`.
    #[error("invalid role: {0:?}")]
    InvalidRole(String),
}
