use crate::events::ConnectionId;
use crate::session::{GameSession, Participants, SessionError, SessionId};
use chessduel_engine::RulesEngine;
use std::collections::HashMap;
use uuid::Uuid;

/// Owns every live session and indexes them by participant connection.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, GameSession>,
    by_connection: HashMap<ConnectionId, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new Active session for two connections that are not in any session yet.
    pub fn create_session(
        &mut self,
        white: ConnectionId,
        black: ConnectionId,
        engine: Box<dyn RulesEngine>,
    ) -> Result<&GameSession, SessionError> {
        let participants = Participants::new(white, black)?;
        if let Some(taken) = participants
            .both()
            .into_iter()
            .find(|id| self.by_connection.contains_key(id))
        {
            return Err(SessionError::AlreadyRegistered(taken));
        }

        let id = format!("game_{}", Uuid::new_v4().simple());
        for connection_id in participants.both() {
            self.by_connection.insert(connection_id, id.clone());
        }

        tracing::info!(
            session_id = %id,
            white = %white,
            black = %black,
            "session created"
        );

        let session = self
            .sessions
            .entry(id.clone())
            .or_insert_with(|| GameSession::new(id, participants, engine));
        Ok(session)
    }

    pub fn session_id_for(&self, connection_id: ConnectionId) -> Option<&SessionId> {
        self.by_connection.get(&connection_id)
    }

    pub fn find_by_connection(&self, connection_id: ConnectionId) -> Option<&GameSession> {
        self.session_id_for(connection_id)
            .and_then(|id| self.sessions.get(id))
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&GameSession> {
        self.sessions.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &SessionId) -> Option<&mut GameSession> {
        self.sessions.get_mut(session_id)
    }

    /// Remove the session and both participant mappings. The returned session is Ended.
    pub fn destroy(&mut self, session_id: &SessionId) -> Option<GameSession> {
        let mut session = self.sessions.remove(session_id)?;
        for connection_id in session.participants().both() {
            self.by_connection.remove(&connection_id);
        }
        session.end();

        tracing::info!(session_id = %session_id, "session destroyed");
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
