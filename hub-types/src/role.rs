//! Peer roles within a relay session.

use crate::error::HubTypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a session an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The player hosting the world.
    Host,
    /// The player joining the world.
    Player,
}

impl Role {
    /// The role on the other end of the session.
    pub fn peer(self) -> Self {
        match self {
            Role::Host => Role::Player,
            Role::Player => Role::Host,
        }
    }

    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Player => "player",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HubTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "host" => Ok(Role::Host),
            "player" => Ok(Role::Player),
            other => Err(HubTypesError::InvalidRole(other.to_string())),
        }
    }
}
