use crate::events::{ConnectionId, EventBus};
use crate::matchmaking::{Enqueued, MatchmakingQueue};
use crate::negotiation;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::registry::SessionRegistry;
use crate::relay;
use crate::session::{SessionError, SessionId, SessionStatus};
use chessduel_engine::{standard_factory, EngineFactory, Side};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// All process-wide matchmaking state. Kept behind one lock so that each
/// inbound event is handled atomically.
#[derive(Debug, Default)]
struct Lobby {
    queue: MatchmakingQueue,
    registry: SessionRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LobbySnapshot {
    pub waiting: bool,
    pub active_sessions: usize,
}

/// Read-only view of the session a connection belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: SessionId,
    pub side: Side,
    pub status: SessionStatus,
    pub position: String,
}

/// Single entry point for transport events. Locates the queue or session a
/// connection belongs to and hands the event to the component that owns it.
pub struct ConnectionEventRouter {
    lobby: Mutex<Lobby>,
    bus: Arc<EventBus>,
    engines: EngineFactory,
}

impl fmt::Debug for ConnectionEventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEventRouter")
            .field("lobby", &self.lobby)
            .finish_non_exhaustive()
    }
}

impl ConnectionEventRouter {
    pub fn new(bus: Arc<EventBus>, engines: EngineFactory) -> Self {
        Self {
            lobby: Mutex::new(Lobby::default()),
            bus,
            engines,
        }
    }

    pub fn with_standard_rules(bus: Arc<EventBus>) -> Self {
        Self::new(bus, standard_factory())
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Queue the connection, or pair it with the one already waiting.
    pub fn on_connect(&self, connection_id: ConnectionId) -> Result<(), SessionError> {
        let mut lobby = self.lock()?;

        let (white, black) = match lobby.queue.enqueue(connection_id) {
            Enqueued::Waiting => {
                tracing::info!(connection_id = %connection_id, "waiting for opponent");
                self.bus.send(connection_id, ServerEvent::WaitingForOpponent);
                return Ok(());
            }
            Enqueued::Paired { white, black } => (white, black),
        };

        let session = lobby
            .registry
            .create_session(white, black, (self.engines)())?;
        let session_id = session.id().clone();
        let position = session.position();

        self.bus.join(&session_id, white);
        self.bus.join(&session_id, black);

        self.bus.broadcast(&session_id, ServerEvent::StartGame);
        self.bus.send(white, ServerEvent::PlayerRole(Side::White));
        self.bus.send(black, ServerEvent::PlayerRole(Side::Black));
        self.bus
            .broadcast(&session_id, ServerEvent::BoardState(position));

        tracing::info!(
            session_id = %session_id,
            white = %white,
            black = %black,
            "players paired"
        );
        Ok(())
    }

    /// Release whatever the connection held. A session loses its other
    /// participant immediately; there is no reconnection.
    pub fn on_disconnect(&self, connection_id: ConnectionId) -> Result<(), SessionError> {
        let mut lobby = self.lock()?;

        if lobby.queue.remove_if_waiting(connection_id) {
            tracing::info!(connection_id = %connection_id, "waiting connection left");
            return Ok(());
        }

        let Some(session_id) = lobby.registry.session_id_for(connection_id).cloned() else {
            tracing::debug!(connection_id = %connection_id, "disconnect without queue entry or session");
            return Ok(());
        };

        self.bus.broadcast_except(
            &session_id,
            connection_id,
            ServerEvent::OpponentDisconnected,
        );
        lobby.registry.destroy(&session_id);
        self.bus.close_room(&session_id);

        tracing::info!(
            session_id = %session_id,
            connection_id = %connection_id,
            "participant disconnected, session closed"
        );
        Ok(())
    }

    pub fn on_event(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), SessionError> {
        let mut lobby = self.lock()?;
        let Lobby { registry, .. } = &mut *lobby;

        let Some(session_id) = registry.session_id_for(connection_id).cloned() else {
            tracing::debug!(
                connection_id = %connection_id,
                event = event.name(),
                "event from connection without a session dropped"
            );
            return Ok(());
        };

        match event {
            ClientEvent::Move(payload) => {
                relay::submit_move(registry, &self.bus, &session_id, connection_id, &payload);
            }
            ClientEvent::RequestEndGame => {
                negotiation::request(registry, &self.bus, &session_id, connection_id);
            }
            ClientEvent::RespondEndGame(accepted) => {
                negotiation::respond(registry, &self.bus, &session_id, connection_id, accepted);
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<LobbySnapshot, SessionError> {
        let lobby = self.lock()?;
        Ok(LobbySnapshot {
            waiting: lobby.queue.waiting().is_some(),
            active_sessions: lobby.registry.len(),
        })
    }

    pub fn session_view(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<SessionView>, SessionError> {
        let lobby = self.lock()?;
        let view = lobby
            .registry
            .find_by_connection(connection_id)
            .and_then(|session| {
                let side = session.participants().side_of(connection_id)?;
                Some(SessionView {
                    session_id: session.id().clone(),
                    side,
                    status: session.status(),
                    position: session.position(),
                })
            });
        Ok(view)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Lobby>, SessionError> {
        self.lobby.lock().map_err(|_| {
            tracing::error!("lobby lock poisoned");
            SessionError::StoragePoisoned
        })
    }
}
