use crate::events::ConnectionId;
use chessduel_engine::{MoveDescriptor, MoveError, RulesEngine, Side, TerminalReason};
use thiserror::Error;

pub type SessionId = String;

/// The two seats of a session. Fixed for the session's whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participants {
    white: ConnectionId,
    black: ConnectionId,
}

impl Participants {
    pub fn new(white: ConnectionId, black: ConnectionId) -> Result<Self, SessionError> {
        if white == black {
            return Err(SessionError::SameParticipant(white));
        }
        Ok(Self { white, black })
    }

    pub fn white(&self) -> ConnectionId {
        self.white
    }

    pub fn black(&self) -> ConnectionId {
        self.black
    }

    pub fn connection(&self, side: Side) -> ConnectionId {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    pub fn side_of(&self, connection_id: ConnectionId) -> Option<Side> {
        if connection_id == self.white {
            Some(Side::White)
        } else if connection_id == self.black {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, connection_id: ConnectionId) -> Option<ConnectionId> {
        self.side_of(connection_id)
            .map(|side| self.connection(side.opposite()))
    }

    pub fn both(&self) -> [ConnectionId; 2] {
        [self.white, self.black]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    PendingEndGameAgreement { requester: ConnectionId },
    Ended,
}

/// One paired game: two participants, the position (owned through the rules
/// engine) and the state of the end-game negotiation.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    participants: Participants,
    engine: Box<dyn RulesEngine>,
    status: SessionStatus,
}

impl GameSession {
    pub fn new(id: SessionId, participants: Participants, engine: Box<dyn RulesEngine>) -> Self {
        Self {
            id,
            participants,
            engine,
            status: SessionStatus::Active,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn participants(&self) -> Participants {
        self.participants
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn pending_requester(&self) -> Option<ConnectionId> {
        match self.status {
            SessionStatus::PendingEndGameAgreement { requester } => Some(requester),
            _ => None,
        }
    }

    pub fn current_turn(&self) -> Side {
        self.engine.current_turn()
    }

    pub fn position(&self) -> String {
        self.engine.serialize_position()
    }

    /// Side of `requester`, provided it is that side's turn.
    pub fn ensure_turn(&self, requester: ConnectionId) -> Result<Side, SessionError> {
        self.ensure_live()?;
        let side = self
            .participants
            .side_of(requester)
            .ok_or(SessionError::NotParticipant(requester))?;
        let expected = self.engine.current_turn();
        if side != expected {
            return Err(SessionError::NotYourTurn { expected });
        }
        Ok(side)
    }

    /// Apply a move for `requester`. Returns the terminal reason when the move
    /// ended the game; the session itself stays open either way.
    pub fn apply_move(
        &mut self,
        requester: ConnectionId,
        mv: &MoveDescriptor,
    ) -> Result<Option<TerminalReason>, SessionError> {
        self.ensure_turn(requester)?;
        self.engine.apply_move(mv)?;

        if !self.engine.is_terminal() {
            return Ok(None);
        }
        Ok(Some(
            self.engine
                .terminal_reason()
                .unwrap_or(TerminalReason::Other),
        ))
    }

    /// Open an end-game negotiation. Returns the participant who must answer.
    pub fn request_end_game(
        &mut self,
        requester: ConnectionId,
    ) -> Result<ConnectionId, SessionError> {
        let opponent = self
            .participants
            .opponent_of(requester)
            .ok_or(SessionError::NotParticipant(requester))?;
        match self.status {
            SessionStatus::Active => {
                self.status = SessionStatus::PendingEndGameAgreement { requester };
                Ok(opponent)
            }
            SessionStatus::PendingEndGameAgreement { .. } => {
                Err(SessionError::NegotiationUnavailable)
            }
            SessionStatus::Ended => Err(SessionError::Ended),
        }
    }

    /// Close the pending negotiation. Acceptance resets the board. Returns the
    /// original requester.
    pub fn resolve_end_game(&mut self, accepted: bool) -> Result<ConnectionId, SessionError> {
        let requester = match self.status {
            SessionStatus::PendingEndGameAgreement { requester } => requester,
            SessionStatus::Active => return Err(SessionError::NoPendingRequest),
            SessionStatus::Ended => return Err(SessionError::Ended),
        };

        if accepted {
            self.engine.reset();
        }
        self.status = SessionStatus::Active;
        Ok(requester)
    }

    pub(crate) fn end(&mut self) {
        self.status = SessionStatus::Ended;
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Ended {
            return Err(SessionError::Ended);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Connection {0} is not a participant of this session")]
    NotParticipant(ConnectionId),
    #[error("Not your turn: {expected} to move")]
    NotYourTurn { expected: Side },
    #[error("Malformed move payload: {0}")]
    MalformedMove(String),
    #[error("Illegal move: {0}")]
    IllegalMove(#[from] MoveError),
    #[error("An end-game request cannot be made now")]
    NegotiationUnavailable,
    #[error("No end-game request is pending")]
    NoPendingRequest,
    #[error("Session has ended")]
    Ended,
    #[error("Connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
    #[error("Connection {0} cannot play against itself")]
    SameParticipant(ConnectionId),
    #[error("Session storage poisoned")]
    StoragePoisoned,
}

// Only a poisoned lobby lock reaches HTTP clients today; everything else is
// handled on the socket.
impl crate::errors::IntoErrorResponse for SessionError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            SessionError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::StoragePoisoned => "session_storage_error",
            _ => "session_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessduel_engine::StandardChess;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn session() -> (GameSession, ConnectionId, ConnectionId) {
        let white = ConnectionId::new();
        let black = ConnectionId::new();
        let participants = Participants::new(white, black).expect("distinct");
        let session = GameSession::new(
            "game_unit".into(),
            participants,
            Box::new(StandardChess::new()),
        );
        (session, white, black)
    }

    #[test]
    fn participants_must_be_distinct() {
        let id = ConnectionId::new();
        assert!(matches!(
            Participants::new(id, id),
            Err(SessionError::SameParticipant(same)) if same == id
        ));
    }

    #[test]
    fn participants_resolve_sides_and_opponents() {
        let (session, white, black) = session();
        let seats = session.participants();
        assert_eq!(seats.side_of(white), Some(Side::White));
        assert_eq!(seats.side_of(black), Some(Side::Black));
        assert_eq!(seats.opponent_of(white), Some(black));
        assert_eq!(seats.side_of(ConnectionId::new()), None);
        assert_eq!(seats.connection(Side::Black), black);
    }

    #[test]
    fn new_session_is_active_at_start_position() {
        let (session, _, _) = session();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.position(), START_FEN);
        assert_eq!(session.pending_requester(), None);
    }

    #[test]
    fn out_of_turn_move_is_rejected_without_change() {
        let (mut session, _, black) = session();
        let err = session
            .apply_move(black, &MoveDescriptor::new("e7", "e5"))
            .expect_err("white moves first");
        assert!(matches!(
            err,
            SessionError::NotYourTurn {
                expected: Side::White
            }
        ));
        assert_eq!(session.position(), START_FEN);
    }

    #[test]
    fn accepted_move_updates_position_and_turn() {
        let (mut session, white, _) = session();
        let terminal = session
            .apply_move(white, &MoveDescriptor::new("e2", "e4"))
            .expect("legal");
        assert_eq!(terminal, None);
        assert_eq!(session.current_turn(), Side::Black);
        assert_ne!(session.position(), START_FEN);
    }

    #[test]
    fn checkmate_is_reported_but_session_stays_active() {
        let (mut session, white, black) = session();
        let moves = [
            (white, "f2", "f3"),
            (black, "e7", "e5"),
            (white, "g2", "g4"),
        ];
        for (who, from, to) in moves {
            session
                .apply_move(who, &MoveDescriptor::new(from, to))
                .expect("legal");
        }
        let terminal = session
            .apply_move(black, &MoveDescriptor::new("d8", "h4"))
            .expect("mating move");
        assert_eq!(
            terminal,
            Some(TerminalReason::Checkmate {
                winner: Side::Black
            })
        );
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn negotiation_round_trip_with_acceptance_resets_board() {
        let (mut session, white, black) = session();
        session
            .apply_move(white, &MoveDescriptor::new("d2", "d4"))
            .expect("legal");

        let answerer = session.request_end_game(white).expect("request");
        assert_eq!(answerer, black);
        assert_eq!(session.pending_requester(), Some(white));

        let requester = session.resolve_end_game(true).expect("respond");
        assert_eq!(requester, white);
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.position(), START_FEN);
    }

    #[test]
    fn declined_negotiation_keeps_position() {
        let (mut session, white, black) = session();
        session
            .apply_move(white, &MoveDescriptor::new("d2", "d4"))
            .expect("legal");
        let before = session.position();

        session.request_end_game(black).expect("request");
        assert_eq!(session.resolve_end_game(false).expect("respond"), black);
        assert_eq!(session.position(), before);
        assert_eq!(session.pending_requester(), None);
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let (mut session, white, black) = session();
        session.request_end_game(white).expect("first request");
        assert!(matches!(
            session.request_end_game(black),
            Err(SessionError::NegotiationUnavailable)
        ));
        assert_eq!(session.pending_requester(), Some(white));
    }

    #[test]
    fn respond_without_request_is_rejected() {
        let (mut session, _, _) = session();
        assert!(matches!(
            session.resolve_end_game(true),
            Err(SessionError::NoPendingRequest)
        ));
    }

    #[test]
    fn ended_session_refuses_everything() {
        let (mut session, white, _) = session();
        session.end();
        assert!(matches!(
            session.apply_move(white, &MoveDescriptor::new("e2", "e4")),
            Err(SessionError::Ended)
        ));
        assert!(matches!(
            session.request_end_game(white),
            Err(SessionError::Ended)
        ));
        assert!(matches!(
            session.resolve_end_game(false),
            Err(SessionError::Ended)
        ));
    }
}
