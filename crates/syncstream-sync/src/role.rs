//! Role controller: decides whether local actions are authoritative.

use syncstream_core::{MessageKind, Role, RoleAssignment};
use tracing::debug;

/// Holds the externally assigned role and gates outbound protocol traffic.
///
/// Only the Master may put SYNC, URL_CHANGE or BROWSER_ACTION messages on
/// the channel. A Follower's attempt is dropped here, before it gets near
/// the channel; that is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleController {
    assignment: RoleAssignment,
}

impl RoleController {
    pub const fn new(assignment: RoleAssignment) -> Self {
        Self { assignment }
    }

    pub const fn role(&self) -> Role {
        self.assignment.role
    }

    pub const fn epoch(&self) -> u64 {
        self.assignment.epoch
    }

    pub const fn is_master(&self) -> bool {
        self.assignment.role.is_master()
    }

    /// Whether a message of `kind` may be published by this client.
    pub fn authorize(&self, kind: MessageKind) -> bool {
        if self.is_master() {
            return true;
        }
        debug!(?kind, role = %self.role(), "Outbound message rejected: not master");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_may_publish_everything() {
        let controller = RoleController::new(RoleAssignment::master(2));
        assert!(controller.authorize(MessageKind::Sync));
        assert!(controller.authorize(MessageKind::UrlChange));
        assert!(controller.authorize(MessageKind::BrowserAction));
        assert_eq!(controller.epoch(), 2);
    }

    #[test]
    fn follower_may_publish_nothing() {
        let controller = RoleController::new(RoleAssignment::follower());
        assert!(!controller.authorize(MessageKind::Sync));
        assert!(!controller.authorize(MessageKind::UrlChange));
        assert!(!controller.authorize(MessageKind::BrowserAction));
    }
}
