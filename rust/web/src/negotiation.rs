use crate::events::{ConnectionId, EventBus};
use crate::protocol::ServerEvent;
use crate::registry::SessionRegistry;
use crate::session::{SessionError, SessionId};

/// Announcement sent to both players when they agree to end the game.
pub const MUTUAL_AGREEMENT_MESSAGE: &str = "Game ended by mutual agreement. Board reset.";

#[derive(Debug)]
pub enum NegotiationOutcome {
    /// Request recorded; `opponent` was asked to answer.
    Requested { opponent: ConnectionId },
    Accepted,
    Declined { requester: ConnectionId },
    /// The session does not allow this step right now; nobody was notified.
    Ignored(SessionError),
}

/// Ask the other participant to end the current game by agreement.
pub fn request(
    registry: &mut SessionRegistry,
    bus: &EventBus,
    session_id: &SessionId,
    requester: ConnectionId,
) -> NegotiationOutcome {
    let Some(session) = registry.get_mut(session_id) else {
        return NegotiationOutcome::Ignored(SessionError::NotFound(session_id.clone()));
    };

    match session.request_end_game(requester) {
        Ok(opponent) => {
            tracing::info!(
                session_id = %session_id,
                requester = %requester,
                "end-game agreement requested"
            );
            bus.send(opponent, ServerEvent::OpponentRequestedEndGame);
            NegotiationOutcome::Requested { opponent }
        }
        Err(err) => ignored(session_id, requester, err),
    }
}

/// Answer the pending request. The responder is not checked against the
/// requester, so either participant may settle it.
pub fn respond(
    registry: &mut SessionRegistry,
    bus: &EventBus,
    session_id: &SessionId,
    responder: ConnectionId,
    accepted: bool,
) -> NegotiationOutcome {
    let Some(session) = registry.get_mut(session_id) else {
        return NegotiationOutcome::Ignored(SessionError::NotFound(session_id.clone()));
    };

    let requester = match session.resolve_end_game(accepted) {
        Ok(requester) => requester,
        Err(err) => return ignored(session_id, responder, err),
    };

    tracing::info!(
        session_id = %session_id,
        responder = %responder,
        accepted,
        "end-game request answered"
    );

    if accepted {
        bus.broadcast(
            session_id,
            ServerEvent::GameEnded(MUTUAL_AGREEMENT_MESSAGE.to_string()),
        );
        bus.broadcast(session_id, ServerEvent::BoardState(session.position()));
        NegotiationOutcome::Accepted
    } else {
        bus.send(requester, ServerEvent::EndGameDeclined);
        NegotiationOutcome::Declined { requester }
    }
}

fn ignored(
    session_id: &SessionId,
    connection_id: ConnectionId,
    err: SessionError,
) -> NegotiationOutcome {
    tracing::debug!(
        session_id = %session_id,
        connection_id = %connection_id,
        error = %err,
        "negotiation step ignored"
    );
    NegotiationOutcome::Ignored(err)
}
