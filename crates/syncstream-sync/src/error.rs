//! Session error types.

use syncstream_core::SettingsError;

/// Errors surfaced by [`crate::RoomSession`] setup and its task handle.
///
/// Nothing that happens inside a running session is an error at this level:
/// bad messages, engine failures and refused permissions are all absorbed
/// by the loop.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("Room id must not be empty")]
    EmptyRoomId,

    #[error("User id must not be empty")]
    EmptyUserId,

    #[error("Session has already stopped")]
    Closed,

    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
