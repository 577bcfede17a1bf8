//! Core domain types, protocol messages and ports for syncstream.
//!
//! This crate has no runtime of its own. It defines what travels over a room
//! channel ([`SyncMessage`]), what a session reports ([`RoomEvent`]), the
//! tunables ([`SyncSettings`]) and the seams to the outside world
//! ([`MediaEngine`], [`Clock`], [`DisplayLock`], [`RoomEventEmitter`]).

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    Interaction, InteractionKind, InteractionPayload, MessageKind, MessagePayload,
    PlaybackState, ProtocolError, Role, RoleAssignment, SyncHealth, SyncMessage, drift_between,
};
pub use events::{Advisory, RoomEvent};
pub use ports::{
    ChannelEmitter, Clock, DisplayLock, DisplayLockError, ManualClock, MediaEngine, MediaError,
    NoopDisplayLock, NoopEmitter, RoomEventEmitter, SystemClock,
};
pub use settings::{
    DEFAULT_ROOM_ID, SettingsError, SettingsUpdate, SyncSettings, validate_settings,
};

/// Generate a fresh participant id for contexts without a login session.
pub fn new_participant_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
use tempfile as _;
