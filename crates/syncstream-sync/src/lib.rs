//! Room channel, role gating, drift correction and co-browse relay.
//!
//! The pieces compose into a [`RoomSession`], one participant's event loop:
//!
//! - [`MessageChannel`]: room-scoped best-effort broadcast bus
//! - [`RoleController`] and [`InboundGate`]: who may speak, whose word counts
//! - [`SyncController`]: Master snapshots, Follower drift correction
//! - [`PlaybackPhase`]: local playback state machine
//! - [`InteractionRelay`]: navigation and gesture mirroring

#![deny(unused_crate_dependencies)]

pub mod channel;
pub mod controller;
pub mod engine;
pub mod error;
pub mod fence;
pub mod heartbeat;
pub mod playback;
pub mod relay;
pub mod role;
pub mod session;

pub use channel::{MessageChannel, RoomHandle, Subscription};
pub use controller::{
    DEFAULT_QUALITY, ReconcileAction, Reconciliation, RemoteOutcome, SyncController,
};
pub use engine::SimulatedMediaEngine;
pub use error::SessionError;
pub use fence::{InboundGate, MasterFence, Rejection, StalenessGuard};
pub use playback::{PlaybackEvent, PlaybackPhase};
pub use relay::{CoBrowseView, InteractionRelay, NavigationHistory, RelayUpdate, normalize_target};
pub use role::RoleController;
pub use session::{
    LocalCommand, RoomSession, SessionBuilder, SessionConfig, SessionReport, SessionTask,
};

#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
