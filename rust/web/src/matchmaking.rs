use crate::events::ConnectionId;

/// Result of putting a connection into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The connection now occupies the waiting slot.
    Waiting,
    /// The connection met the one that was waiting. The earlier arrival plays White.
    Paired {
        white: ConnectionId,
        black: ConnectionId,
    },
}

/// Single waiting slot: at most one connection waits for an opponent.
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    waiting: Option<ConnectionId>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, connection_id: ConnectionId) -> Enqueued {
        match self.waiting {
            // Re-enqueueing the waiting connection must never pair it with itself.
            Some(waiting) if waiting == connection_id => Enqueued::Waiting,
            Some(waiting) => {
                self.waiting = None;
                Enqueued::Paired {
                    white: waiting,
                    black: connection_id,
                }
            }
            None => {
                self.waiting = Some(connection_id);
                Enqueued::Waiting
            }
        }
    }

    /// Clear the slot if `connection_id` holds it. Returns whether it did.
    pub fn remove_if_waiting(&mut self, connection_id: ConnectionId) -> bool {
        if self.waiting == Some(connection_id) {
            self.waiting = None;
            true
        } else {
            false
        }
    }

    pub fn waiting(&self) -> Option<ConnectionId> {
        self.waiting
    }
}
