//! Canonical event union emitted by a room session.
//!
//! Events describe local state changes a presentation layer would render:
//! sync health, playback state, ducking volume, advisories. They never cross
//! the room channel.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "health_changed", "health": "LAGGING", "drift": 1.5 }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{InteractionKind, InteractionPayload, PlaybackState, Role, SyncHealth};

/// Feature that degraded because a permission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// Microphone refused; ducking is disabled for the session.
    MicrophoneDenied,
    /// Display lock refused; the screen may sleep during playback.
    DisplayLockDenied,
}

/// Events emitted by a room session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// The session joined its room channel.
    SessionOpened {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        role: Role,
    },

    /// The session released all of its resources.
    SessionClosed {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Follower sync health flipped between GOOD and LAGGING.
    HealthChanged { health: SyncHealth, drift: f64 },

    /// Local playback state changed.
    PlaybackChanged { state: PlaybackState },

    /// A different media resource was loaded.
    MediaChanged {
        #[serde(rename = "mediaRef")]
        media_ref: String,
    },

    /// The media engine reported a fault. Dismissible.
    MediaFault { reason: String },

    /// A media fault was dismissed by the user.
    FaultDismissed,

    /// Co-browsing surface navigated.
    NavigationChanged { location: String },

    /// A Master gesture was mirrored onto the local co-browsing surface.
    InteractionMirrored {
        kind: InteractionKind,
        payload: InteractionPayload,
    },

    /// Local voice activity changed.
    SpeakingChanged {
        #[serde(rename = "isSpeaking")]
        is_speaking: bool,
    },

    /// Effective playback volume changed.
    VolumeChanged { volume: f32 },

    /// One-time advisory about a degraded feature.
    Advisory { advisory: Advisory },
}
