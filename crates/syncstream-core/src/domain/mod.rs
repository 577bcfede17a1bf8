//! Domain types shared by every syncstream crate.

mod health;
mod interaction;
mod message;
mod playback;
mod role;

pub use health::{SyncHealth, drift_between};
pub use interaction::{Interaction, InteractionKind, InteractionPayload};
pub use message::{MessageKind, MessagePayload, ProtocolError, SyncMessage};
pub use playback::PlaybackState;
pub use role::{Role, RoleAssignment};
