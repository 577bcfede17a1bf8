//! The SyncStream wire protocol.
//!
//! Every message travelling over a room channel is a [`SyncMessage`]: a small
//! envelope (sender, send time, master epoch) around one of three payloads.
//!
//! # Wire Format
//!
//! Messages serialize to JSON with a `type` tag and camelCase fields:
//!
//! ```json
//! { "type": "SYNC", "senderId": "u1", "timestamp": 1700000000000, "epoch": 0,
//!   "position": 10.0, "state": "PLAYING", "mediaRef": "movie.mp4", "quality": "1080p" }
//! ```

use serde::{Deserialize, Serialize};

use super::interaction::{Interaction, InteractionKind, InteractionPayload};
use super::playback::PlaybackState;

/// Discriminant of a [`MessagePayload`], used for authorization and staleness
/// bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Sync,
    UrlChange,
    BrowserAction,
}

/// Payload union of a [`SyncMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePayload {
    /// Authoritative playback snapshot from the Master.
    #[serde(rename_all = "camelCase")]
    Sync {
        /// Playback position in seconds.
        position: f64,
        state: PlaybackState,
        /// Opaque resource identifier of the loaded media.
        media_ref: String,
        /// Advisory quality label (e.g. "1080p").
        quality: String,
    },

    /// Navigation target on the co-browsing surface.
    #[serde(rename_all = "camelCase")]
    UrlChange { co_browse_ref: String },

    /// Mirrored gesture on the co-browsing surface.
    #[serde(rename_all = "camelCase")]
    BrowserAction {
        interaction_kind: InteractionKind,
        interaction_payload: InteractionPayload,
    },
}

impl MessagePayload {
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Sync { .. } => MessageKind::Sync,
            Self::UrlChange { .. } => MessageKind::UrlChange,
            Self::BrowserAction { .. } => MessageKind::BrowserAction,
        }
    }

    pub const fn browser_action(interaction: Interaction) -> Self {
        let (interaction_kind, interaction_payload) = interaction.into_parts();
        Self::BrowserAction {
            interaction_kind,
            interaction_payload,
        }
    }
}

/// Immutable protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    pub sender_id: String,
    /// Sender wall-clock send time in milliseconds since the Unix epoch.
    /// Non-decreasing per sender.
    pub timestamp: i64,
    /// Master term the sender held when sending.
    #[serde(default)]
    pub epoch: u64,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

/// Reasons an inbound message is discarded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Message has an empty sender id")]
    MissingSender,

    #[error("Invalid playback position: {0}")]
    InvalidPosition(f64),

    #[error("Interaction payload does not match kind {0:?}")]
    InteractionMismatch(InteractionKind),

    #[error("Empty navigation target")]
    EmptyNavigationTarget,
}

impl SyncMessage {
    pub fn new(
        sender_id: impl Into<String>,
        timestamp: i64,
        epoch: u64,
        payload: MessagePayload,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            timestamp,
            epoch,
            payload,
        }
    }

    pub const fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// Decode and validate a JSON message.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(raw)?;
        message.validate()?;
        Ok(message)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the invariants a handler relies on.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.sender_id.trim().is_empty() {
            return Err(ProtocolError::MissingSender);
        }
        match &self.payload {
            MessagePayload::Sync { position, .. } => {
                if !position.is_finite() || *position < 0.0 {
                    return Err(ProtocolError::InvalidPosition(*position));
                }
            }
            MessagePayload::UrlChange { co_browse_ref } => {
                if co_browse_ref.trim().is_empty() {
                    return Err(ProtocolError::EmptyNavigationTarget);
                }
            }
            MessagePayload::BrowserAction { .. } => {
                self.interaction()?;
            }
        }
        Ok(())
    }

    /// Typed gesture of a BROWSER_ACTION message.
    ///
    /// Returns `Ok(None)` for other message kinds.
    pub fn interaction(&self) -> Result<Option<Interaction>, ProtocolError> {
        match self.payload {
            MessagePayload::BrowserAction {
                interaction_kind,
                interaction_payload,
            } => Interaction::from_parts(interaction_kind, interaction_payload)
                .map(Some)
                .ok_or(ProtocolError::InteractionMismatch(interaction_kind)),
            _ => Ok(None),
        }
    }
}
