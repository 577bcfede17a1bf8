//! Local playback state machine.

use std::fmt;

use syncstream_core::PlaybackState;

/// Local playback phase.
///
/// Unlike the wire [`PlaybackState`] this carries an error phase, which is
/// never broadcast and must be dismissed before reconciliation may resume
/// playback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    Playing,
    #[default]
    Paused,
    Buffering,
    Error(String),
}

/// Inputs to [`PlaybackPhase::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Play,
    Pause,
    Stalled,
    Resumed,
    Fault(String),
    Dismiss,
    /// A different media resource was loaded. Clears an error.
    MediaReplaced,
}

impl PlaybackPhase {
    /// Pure transition function.
    #[must_use]
    pub fn apply(self, event: PlaybackEvent) -> Self {
        match (self, event) {
            (_, PlaybackEvent::Fault(reason)) => Self::Error(reason),
            // Freshly loaded media sits paused at the start.
            (_, PlaybackEvent::MediaReplaced) | (Self::Error(_), PlaybackEvent::Dismiss) => {
                Self::Paused
            }
            (error @ Self::Error(_), _) => error,
            (_, PlaybackEvent::Pause) => Self::Paused,
            (Self::Paused, PlaybackEvent::Play) | (Self::Buffering, PlaybackEvent::Resumed) => {
                Self::Playing
            }
            (Self::Playing, PlaybackEvent::Stalled) => Self::Buffering,
            (phase, _) => phase,
        }
    }

    /// Paused for reconciliation purposes. An error counts as paused;
    /// buffering does not.
    pub const fn is_paused(&self) -> bool {
        matches!(self, Self::Paused | Self::Error(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// State broadcast by a Master in this phase.
    pub const fn wire_state(&self) -> PlaybackState {
        match self {
            Self::Playing => PlaybackState::Playing,
            Self::Buffering => PlaybackState::Buffering,
            Self::Paused | Self::Error(_) => PlaybackState::Paused,
        }
    }
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "PLAYING"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Buffering => write!(f, "BUFFERING"),
            Self::Error(reason) => write!(f, "ERROR({reason})"),
        }
    }
}
