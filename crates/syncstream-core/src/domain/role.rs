//! Participant roles within a room.

use serde::{Deserialize, Serialize};

/// Role a client holds for the lifetime of a room view.
///
/// Roles are assigned externally and never negotiated by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// The sole authoritative client; drives playback and co-browse truth.
    Master,
    /// Reconciles to whatever the Master broadcasts.
    Follower,
}

impl Role {
    pub const fn is_master(self) -> bool {
        matches!(self, Self::Master)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Master => write!(f, "MASTER"),
            Self::Follower => write!(f, "FOLLOWER"),
        }
    }
}

/// External role assignment for one session.
///
/// `epoch` is the Master's term. Followers use it to fence off messages
/// from a superseded Master; a reassigned Master must be handed a higher
/// epoch than its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
    #[serde(default)]
    pub epoch: u64,
}

impl RoleAssignment {
    pub const fn master(epoch: u64) -> Self {
        Self {
            role: Role::Master,
            epoch,
        }
    }

    pub const fn follower() -> Self {
        Self {
            role: Role::Follower,
            epoch: 0,
        }
    }
}
