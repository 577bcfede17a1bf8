//! Event emitter trait for session event delivery.
//!
//! This module defines the abstraction for emitting [`RoomEvent`]s.
//! Implementations handle transport details (channels, UI bindings, logs).

use tokio::sync::mpsc;

use crate::events::RoomEvent;

/// Trait for emitting room events.
///
/// Keeps channel types out of the session's public API.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts that don't need events
/// - `ChannelEmitter` - Forwards into an unbounded tokio channel
pub trait RoomEventEmitter: Send + Sync {
    /// Emit a room event. Must not block.
    fn emit(&self, event: RoomEvent);
}

/// A no-op event emitter.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    pub const fn new() -> Self {
        Self
    }
}

impl RoomEventEmitter for NoopEmitter {
    fn emit(&self, _event: RoomEvent) {
        // Intentionally do nothing
    }
}

/// Emitter backed by an unbounded mpsc channel.
///
/// Events emitted after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<RoomEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RoomEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RoomEventEmitter for ChannelEmitter {
    fn emit(&self, event: RoomEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Room event dropped, receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_noop_emitter() {
        let emitter: Arc<dyn RoomEventEmitter> = Arc::new(NoopEmitter::new());
        emitter.emit(RoomEvent::FaultDismissed);
    }

    #[test]
    fn test_channel_emitter_delivers_in_order() {
        let (emitter, mut rx) = ChannelEmitter::new();
        emitter.emit(RoomEvent::FaultDismissed);
        emitter.emit(RoomEvent::VolumeChanged { volume: 0.5 });

        assert_eq!(rx.try_recv().unwrap(), RoomEvent::FaultDismissed);
        assert_eq!(rx.try_recv().unwrap(), RoomEvent::VolumeChanged { volume: 0.5 });
    }

    #[test]
    fn test_channel_emitter_survives_closed_receiver() {
        let (emitter, rx) = ChannelEmitter::new();
        drop(rx);
        emitter.emit(RoomEvent::FaultDismissed);
    }
}
