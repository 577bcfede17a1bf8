//! Voice error types.

/// Errors that can occur while monitoring the microphone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    /// Microphone permission denied.
    #[error("Microphone permission denied")]
    MicrophonePermissionDenied,

    /// The microphone is already open.
    #[error("Microphone is already open")]
    AlreadyActive,
}

impl VoiceError {
    /// Whether this failure should be surfaced as a permission advisory
    /// rather than a plain log line.
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::MicrophonePermissionDenied)
    }
}
