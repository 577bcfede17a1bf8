//! Port for the playable surface a session drives.
//!
//! The core never decodes or transports media itself. It calls into a
//! [`MediaEngine`] for play/pause/seek and reads the current position back.
//! Engine faults are reported to the session out of band (see
//! `LocalCommand::Fault` in the sync crate), mirroring an error callback.

/// Errors surfaced by a media engine call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// No resource is loaded yet.
    #[error("No media loaded")]
    NotLoaded,

    /// The engine refused to start playback (autoplay policy, decoder busy).
    #[error("Playback request rejected: {0}")]
    PlayRejected(String),

    /// The resource could not be opened.
    #[error("Failed to open media '{media_ref}': {reason}")]
    OpenFailed { media_ref: String, reason: String },
}

/// Playable-surface abstraction.
///
/// Calls are expected to return promptly; anything asynchronous inside the
/// engine is its own business and failures are captured best-effort.
pub trait MediaEngine: Send {
    /// Swap the loaded resource. Position resets to zero and the engine pauses.
    fn load(&mut self, media_ref: &str) -> Result<(), MediaError>;

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    /// Jump to `position` seconds. Out-of-range positions are clamped by the engine.
    fn seek(&mut self, position: f64);

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    /// Duration of the loaded resource, if known.
    fn duration(&self) -> Option<f64>;

    fn is_paused(&self) -> bool;

    /// Apply an output volume in `[0.0, 1.0]`.
    fn set_volume(&mut self, volume: f32);
}
