//! Co-browsing gestures mirrored from the Master to Followers.

use serde::{Deserialize, Serialize};

/// Kind of gesture carried by a BROWSER_ACTION message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    Scroll,
    Click,
    Hover,
}

/// Kind-specific gesture data as it appears on the wire.
///
/// Pointer gestures carry both coordinates; a scroll carries only the
/// vertical offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InteractionPayload {
    Pointer { x: f64, y: f64 },
    Offset { y: f64 },
}

/// A single gesture on the co-browsing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    Scroll { y: f64 },
    Click { x: f64, y: f64 },
    Hover { x: f64, y: f64 },
}

impl Interaction {
    pub const fn kind(&self) -> InteractionKind {
        match self {
            Self::Scroll { .. } => InteractionKind::Scroll,
            Self::Click { .. } => InteractionKind::Click,
            Self::Hover { .. } => InteractionKind::Hover,
        }
    }

    /// Split into wire parts.
    pub const fn into_parts(self) -> (InteractionKind, InteractionPayload) {
        match self {
            Self::Scroll { y } => (InteractionKind::Scroll, InteractionPayload::Offset { y }),
            Self::Click { x, y } => (InteractionKind::Click, InteractionPayload::Pointer { x, y }),
            Self::Hover { x, y } => (InteractionKind::Hover, InteractionPayload::Pointer { x, y }),
        }
    }

    /// Rebuild from wire parts. Returns `None` when the payload shape does
    /// not fit the kind or a coordinate is not finite.
    pub fn from_parts(kind: InteractionKind, payload: InteractionPayload) -> Option<Self> {
        let interaction = match (kind, payload) {
            (InteractionKind::Scroll, InteractionPayload::Offset { y }) => Self::Scroll { y },
            (InteractionKind::Click, InteractionPayload::Pointer { x, y }) => Self::Click { x, y },
            (InteractionKind::Hover, InteractionPayload::Pointer { x, y }) => Self::Hover { x, y },
            _ => return None,
        };
        interaction.is_finite().then_some(interaction)
    }

    fn is_finite(&self) -> bool {
        match *self {
            Self::Scroll { y } => y.is_finite(),
            Self::Click { x, y } | Self::Hover { x, y } => x.is_finite() && y.is_finite(),
        }
    }
}
