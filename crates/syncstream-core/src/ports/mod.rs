//! Port definitions: the seams between the sync core and its environment.

mod clock;
mod display_lock;
mod event_emitter;
mod media;

pub use clock::{Clock, ManualClock, SystemClock};
pub use display_lock::{DisplayLock, DisplayLockError, NoopDisplayLock};
pub use event_emitter::{ChannelEmitter, NoopEmitter, RoomEventEmitter};
pub use media::{MediaEngine, MediaError};
