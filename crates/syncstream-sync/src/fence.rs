//! Admission of inbound messages on a Follower.
//!
//! Before a Follower acts on anything it checks three things, in order:
//!
//! 1. the message is well formed ([`SyncMessage::validate`]);
//! 2. it comes from the Master this Follower currently recognizes
//!    ([`MasterFence`]);
//! 3. it is not older than what was already applied for the same kind of
//!    state ([`StalenessGuard`]).
//!
//! The channel gives no ordering guarantee, so (3) is what stops a delayed
//! heartbeat from undoing a newer correction.

use std::collections::HashMap;

use syncstream_core::{MessageKind, ProtocolError, SyncMessage};
use tracing::{debug, info, warn};

/// Why an inbound message was not applied.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("malformed message: {0}")]
    Malformed(#[from] ProtocolError),

    #[error("local client is the master")]
    NotFollower,

    #[error("sender {sender} holds superseded epoch {epoch} (current {current})")]
    SupersededMaster {
        sender: String,
        epoch: u64,
        current: u64,
    },

    #[error("sender {sender} is not the recognized master for epoch {epoch}")]
    ConflictingMaster { sender: String, epoch: u64 },

    #[error("stale {kind:?} message at {timestamp} (already applied {latest})")]
    Stale {
        kind: MessageKind,
        timestamp: i64,
        latest: i64,
    },
}

/// Outcome of a fence check that let the message through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceVerdict {
    /// Sender is the recognized Master.
    Accepted,
    /// Sender carries a newer epoch (or is the first seen) and is now the Master.
    NewMaster,
}

/// Tracks which sender is the Master, by epoch.
///
/// A higher epoch always wins. Within one epoch the first sender seen is the
/// Master and any other sender at that epoch is refused.
#[derive(Debug, Clone, Default)]
pub struct MasterFence {
    current: Option<(u64, String)>,
}

impl MasterFence {
    pub fn check(&mut self, sender: &str, epoch: u64) -> Result<FenceVerdict, Rejection> {
        match &self.current {
            Some((current_epoch, current_sender)) if epoch == *current_epoch => {
                if current_sender == sender {
                    Ok(FenceVerdict::Accepted)
                } else {
                    Err(Rejection::ConflictingMaster {
                        sender: sender.to_string(),
                        epoch,
                    })
                }
            }
            Some((current_epoch, _)) if epoch < *current_epoch => Err(Rejection::SupersededMaster {
                sender: sender.to_string(),
                epoch,
                current: *current_epoch,
            }),
            _ => {
                info!(sender, epoch, "Recognizing new master");
                self.current = Some((epoch, sender.to_string()));
                Ok(FenceVerdict::NewMaster)
            }
        }
    }

    /// The recognized Master's id, if any.
    pub fn master(&self) -> Option<&str> {
        self.current.as_ref().map(|(_, sender)| sender.as_str())
    }
}

/// Highest applied timestamp per kind of state.
#[derive(Debug, Clone, Default)]
pub struct StalenessGuard {
    latest: HashMap<MessageKind, i64>,
}

impl StalenessGuard {
    /// Admit a message unless it is strictly older than the newest applied
    /// one of the same kind. Equal timestamps are admitted again.
    pub fn admit(&mut self, kind: MessageKind, timestamp: i64) -> Result<(), Rejection> {
        match self.latest.get(&kind) {
            Some(&latest) if timestamp < latest => Err(Rejection::Stale {
                kind,
                timestamp,
                latest,
            }),
            _ => {
                self.latest.insert(kind, timestamp);
                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        self.latest.clear();
    }
}

/// Validation, fencing and staleness in one place.
#[derive(Debug, Clone, Default)]
pub struct InboundGate {
    fence: MasterFence,
    guard: StalenessGuard,
}

impl InboundGate {
    pub fn admit(&mut self, message: &SyncMessage) -> Result<(), Rejection> {
        message.validate()?;

        if self.fence.check(&message.sender_id, message.epoch)? == FenceVerdict::NewMaster {
            // Timestamps of a different sender are not comparable.
            self.guard.reset();
        }

        self.guard.admit(message.kind(), message.timestamp)
    }

    pub fn master(&self) -> Option<&str> {
        self.fence.master()
    }
}

/// Log a rejection at the level it deserves.
pub fn log_rejection(rejection: &Rejection) {
    match rejection {
        Rejection::NotFollower => {}
        Rejection::Stale { .. } | Rejection::Malformed(_) => debug!(%rejection, "Inbound message discarded"),
        Rejection::SupersededMaster { .. } | Rejection::ConflictingMaster { .. } => {
            warn!(%rejection, "Inbound message fenced");
        }
    }
}
