//! Wire-level playback state.

use serde::{Deserialize, Serialize};

/// Playback state as carried in SYNC messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    Playing,
    #[default]
    Paused,
    /// Reported by the media engine; advisory only.
    Buffering,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Playing => "PLAYING",
            Self::Paused => "PAUSED",
            Self::Buffering => "BUFFERING",
        };
        f.write_str(label)
    }
}
