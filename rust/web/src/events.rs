use crate::protocol::ServerEvent;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

// Bounded so a stalled client cannot grow memory without limit.
// A connection whose buffer fills up is detached from the bus.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

pub type EventSender = mpsc::Sender<ServerEvent>;
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

/// Opaque identity of one live transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Outbound side of a connection. Dropping it detaches the connection from the bus.
pub struct Attachment {
    bus: EventBus,
    connection_id: ConnectionId,
    pub receiver: EventReceiver,
}

impl Attachment {
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn receiver(&mut self) -> &mut EventReceiver {
        &mut self.receiver
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.bus.detach(self.connection_id);
    }
}

/// Routes outbound events to single connections or to every member of a
/// session's broadcast group ("room").
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug)]
struct EventBusInner {
    connections: RwLock<HashMap<ConnectionId, EventSender>>,
    rooms: RwLock<HashMap<SessionId, Vec<ConnectionId>>>,
    buffer: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_OUTBOUND_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                connections: RwLock::new(HashMap::new()),
                rooms: RwLock::new(HashMap::new()),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register the outbound channel of a freshly accepted connection.
    pub fn attach(&self, connection_id: ConnectionId) -> Attachment {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner
            .connections
            .write()
            .expect("connection lock poisoned")
            .insert(connection_id, tx);

        tracing::debug!(connection_id = %connection_id, "connection attached to event bus");

        Attachment {
            bus: self.clone(),
            connection_id,
            receiver: rx,
        }
    }

    pub fn detach(&self, connection_id: ConnectionId) {
        let removed = self
            .inner
            .connections
            .write()
            .expect("connection lock poisoned")
            .remove(&connection_id);

        if removed.is_some() {
            tracing::debug!(connection_id = %connection_id, "connection detached from event bus");
        }
    }

    pub fn join(&self, room: &SessionId, connection_id: ConnectionId) {
        let mut guard = self.inner.rooms.write().expect("room lock poisoned");
        let members = guard.entry(room.clone()).or_default();
        if !members.contains(&connection_id) {
            members.push(connection_id);
        }
    }

    pub fn close_room(&self, room: &SessionId) {
        self.inner
            .rooms
            .write()
            .expect("room lock poisoned")
            .remove(room);
    }

    pub fn room_members(&self, room: &SessionId) -> Vec<ConnectionId> {
        self.inner
            .rooms
            .read()
            .expect("room lock poisoned")
            .get(room)
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver to one connection only.
    pub fn send(&self, connection_id: ConnectionId, event: ServerEvent) {
        tracing::trace!(connection_id = %connection_id, event = event.name(), "sending event");
        self.deliver(&[connection_id], &event);
    }

    /// Deliver to every member of the room.
    pub fn broadcast(&self, room: &SessionId, event: ServerEvent) {
        tracing::debug!(session_id = %room, event = event.name(), "broadcasting event");
        let members = self.room_members(room);
        if members.is_empty() {
            tracing::debug!(session_id = %room, "no members in room");
            return;
        }
        self.deliver(&members, &event);
    }

    /// Deliver to every member of the room except `excluded`.
    pub fn broadcast_except(&self, room: &SessionId, excluded: ConnectionId, event: ServerEvent) {
        let members: Vec<_> = self
            .room_members(room)
            .into_iter()
            .filter(|id| *id != excluded)
            .collect();
        self.deliver(&members, &event);
    }

    pub fn connection_count(&self) -> usize {
        self.inner
            .connections
            .read()
            .expect("connection lock poisoned")
            .len()
    }

    fn deliver(&self, targets: &[ConnectionId], event: &ServerEvent) {
        let senders: Vec<(ConnectionId, EventSender)> = {
            let guard = self
                .inner
                .connections
                .read()
                .expect("connection lock poisoned");
            targets
                .iter()
                .filter_map(|id| guard.get(id).map(|tx| (*id, tx.clone())))
                .collect()
        };

        for (id, sender) in senders {
            // try_send never blocks the event loop; a full or closed channel
            // means the client is gone or too slow, so it gets dropped.
            if let Err(err) = sender.try_send(event.clone()) {
                tracing::warn!(
                    connection_id = %id,
                    event = event.name(),
                    error = %err,
                    "failed to deliver event, detaching connection"
                );
                self.detach(id);
            }
        }
    }
}
