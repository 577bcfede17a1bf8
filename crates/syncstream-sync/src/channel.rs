//! Room-scoped message channel.
//!
//! A [`MessageChannel`] is a registry of broadcast buses keyed by room id.
//! Every participant opens a [`RoomHandle`] on its room; a message published
//! through one handle reaches every other handle open on the same room at
//! that moment, and nobody else.
//!
//! Delivery is best-effort: no acknowledgement, no retry, no replay for late
//! joiners. A receiver that falls more than the channel capacity behind skips
//! what it missed. Bus entries are reference-counted by open handles and the
//! entry is removed when the last handle on a room closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use syncstream_core::settings::MAX_CHANNEL_CAPACITY;
use syncstream_core::{SyncMessage, SyncSettings};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// One message in flight, tagged with the handle that published it.
#[derive(Debug, Clone)]
struct Delivery {
    origin: u64,
    message: Arc<SyncMessage>,
}

struct RoomBus {
    sender: broadcast::Sender<Delivery>,
    open_handles: usize,
}

struct Registry {
    rooms: Mutex<HashMap<String, RoomBus>>,
    next_handle_id: AtomicU64,
    capacity: usize,
}

impl Registry {
    fn rooms(&self) -> MutexGuard<'_, HashMap<String, RoomBus>> {
        // Entries are only counters and senders; a poisoned map is still consistent.
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, room_id: &str) {
        let mut rooms = self.rooms();
        let Some(bus) = rooms.get_mut(room_id) else {
            return;
        };
        bus.open_handles = bus.open_handles.saturating_sub(1);
        if bus.open_handles == 0 {
            rooms.remove(room_id);
            debug!(room_id, "Last handle closed, room bus torn down");
        }
    }
}

/// Registry of room buses. Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct MessageChannel {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("rooms", &self.room_count())
            .field("capacity", &self.registry.capacity)
            .finish()
    }
}

impl MessageChannel {
    /// Create a registry whose buses buffer `capacity` messages per room,
    /// clamped to `1..=MAX_CHANNEL_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                rooms: Mutex::new(HashMap::new()),
                next_handle_id: AtomicU64::new(1),
                capacity: capacity.clamp(1, MAX_CHANNEL_CAPACITY),
            }),
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(settings.effective_channel_capacity())
    }

    /// Join a room. Creates the room bus if this is the first handle.
    pub fn open(&self, room_id: &str) -> RoomHandle {
        let id = self.registry.next_handle_id.fetch_add(1, Ordering::Relaxed);
        let sender = {
            let mut rooms = self.registry.rooms();
            let bus = rooms.entry(room_id.to_string()).or_insert_with(|| {
                debug!(room_id, "Creating room bus");
                RoomBus {
                    sender: broadcast::channel(self.registry.capacity).0,
                    open_handles: 0,
                }
            });
            bus.open_handles += 1;
            bus.sender.clone()
        };
        let receiver = sender.subscribe();

        trace!(room_id, handle = id, "Room handle opened");
        RoomHandle {
            room_id: room_id.to_string(),
            id,
            sender,
            receiver,
            registry: Arc::clone(&self.registry),
            closed: false,
        }
    }

    /// Run `handler` for every message delivered to a fresh handle on
    /// `room_id`, on a background task.
    ///
    /// Dropping (or calling [`Subscription::unsubscribe`] on) the returned
    /// value stops delivery and closes the handle.
    pub fn subscribe<F>(&self, room_id: &str, mut handler: F) -> Subscription
    where
        F: FnMut(SyncMessage) + Send + 'static,
    {
        let mut handle = self.open(room_id);
        let task = tokio::spawn(async move {
            while let Some(message) = handle.recv().await {
                handler(message);
            }
        });
        Subscription { task }
    }

    /// Number of open handles on a room.
    pub fn subscriber_count(&self, room_id: &str) -> usize {
        self.registry
            .rooms()
            .get(room_id)
            .map_or(0, |bus| bus.open_handles)
    }

    /// Number of rooms with at least one open handle.
    pub fn room_count(&self) -> usize {
        self.registry.rooms().len()
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new(syncstream_core::settings::DEFAULT_CHANNEL_CAPACITY)
    }
}

/// One participant's connection to a room bus.
pub struct RoomHandle {
    room_id: String,
    id: u64,
    sender: broadcast::Sender<Delivery>,
    receiver: broadcast::Receiver<Delivery>,
    registry: Arc<Registry>,
    closed: bool,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("room_id", &self.room_id)
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl RoomHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Fire-and-forget broadcast to every other open handle on the room.
    ///
    /// A no-op once the handle is closed.
    pub fn publish(&self, message: SyncMessage) {
        if self.closed {
            trace!(room_id = %self.room_id, "Publish after close ignored");
            return;
        }
        let delivery = Delivery {
            origin: self.id,
            message: Arc::new(message),
        };
        // Our own receiver keeps the bus alive, so this only fails if nobody listens.
        let _ = self.sender.send(delivery);
    }

    /// Wait for the next message from another participant.
    ///
    /// Returns `None` once the handle is closed.
    pub async fn recv(&mut self) -> Option<SyncMessage> {
        while !self.closed {
            match self.receiver.recv().await {
                Ok(delivery) => {
                    if let Some(message) = self.accept(delivery) {
                        return Some(message);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(room_id = %self.room_id, skipped, "Receiver lagged, messages dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
        None
    }

    /// Take the next already-delivered message without waiting.
    pub fn try_recv(&mut self) -> Option<SyncMessage> {
        while !self.closed {
            match self.receiver.try_recv() {
                Ok(delivery) => {
                    if let Some(message) = self.accept(delivery) {
                        return Some(message);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(room_id = %self.room_id, skipped, "Receiver lagged, messages dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
        None
    }

    /// Leave the room. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.registry.release(&self.room_id);
        trace!(room_id = %self.room_id, handle = self.id, "Room handle closed");
    }

    fn accept(&self, delivery: Delivery) -> Option<SyncMessage> {
        (delivery.origin != self.id).then(|| (*delivery.message).clone())
    }
}

impl Drop for RoomHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Capability returned by [`MessageChannel::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivery and leave the room.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Aborting drops the task's handle, which releases the room entry.
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncstream_core::MessagePayload;

    fn nav(sender: &str, target: &str) -> SyncMessage {
        SyncMessage::new(
            sender,
            1,
            0,
            MessagePayload::UrlChange {
                co_browse_ref: target.to_string(),
            },
        )
    }

    #[test]
    fn no_self_delivery() {
        let channel = MessageChannel::default();
        let mut a = channel.open("room");
        let mut b = channel.open("room");

        a.publish(nav("a", "https://one.example"));
        assert!(a.try_recv().is_none());
        assert_eq!(b.try_recv(), Some(nav("a", "https://one.example")));
    }

    #[test]
    fn rooms_are_isolated() {
        let channel = MessageChannel::default();
        let a = channel.open("room-1");
        let mut other = channel.open("room-2");

        a.publish(nav("a", "https://one.example"));
        assert!(other.try_recv().is_none());
    }

    #[test]
    fn late_joiner_misses_earlier_messages() {
        let channel = MessageChannel::default();
        let a = channel.open("room");
        a.publish(nav("a", "https://early.example"));

        let mut late = channel.open("room");
        assert!(late.try_recv().is_none());

        a.publish(nav("a", "https://late.example"));
        assert_eq!(late.try_recv(), Some(nav("a", "https://late.example")));
    }

    #[test]
    fn publish_after_close_is_silent() {
        let channel = MessageChannel::default();
        let mut a = channel.open("room");
        let mut b = channel.open("room");

        a.close();
        a.publish(nav("a", "https://void.example"));
        assert!(b.try_recv().is_none());
        assert!(a.try_recv().is_none());
    }

    #[test]
    fn room_entry_is_reference_counted() {
        let channel = MessageChannel::default();
        let a = channel.open("room");
        let mut b = channel.open("room");
        assert_eq!(channel.subscriber_count("room"), 2);

        drop(a);
        assert_eq!(channel.subscriber_count("room"), 1);
        assert_eq!(channel.room_count(), 1);

        b.close();
        b.close();
        assert_eq!(channel.subscriber_count("room"), 0);
        assert_eq!(channel.room_count(), 0);
    }

    #[test]
    fn lagging_receiver_skips_overflow() {
        let channel = MessageChannel::new(2);
        let a = channel.open("room");
        let mut b = channel.open("room");

        for i in 0..5 {
            a.publish(nav("a", &format!("https://{i}.example")));
        }

        // Only the newest messages that fit the buffer survive.
        assert_eq!(b.try_recv(), Some(nav("a", "https://3.example")));
        assert_eq!(b.try_recv(), Some(nav("a", "https://4.example")));
        assert!(b.try_recv().is_none());
    }

    #[test]
    fn oversized_capacity_is_clamped() {
        let channel = MessageChannel::new(usize::MAX);
        let mut a = channel.open("room");
        let mut b = channel.open("room");

        a.publish(nav("a", "https://one.example"));
        assert_eq!(b.try_recv(), Some(nav("a", "https://one.example")));
        assert!(!a.is_closed());
        a.close();
        assert!(a.is_closed());
    }

    #[tokio::test]
    async fn subscribe_invokes_handler_until_unsubscribed() {
        let channel = MessageChannel::default();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = channel.subscribe("room", move |message| {
            let _ = tx.send(message);
        });
        let publisher = channel.open("room");

        publisher.publish(nav("p", "https://one.example"));
        assert_eq!(rx.recv().await, Some(nav("p", "https://one.example")));

        subscription.unsubscribe();
        for _ in 0..16 {
            if channel.subscriber_count("room") == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(channel.subscriber_count("room"), 1);
    }
}
