use crate::events::{ConnectionId, EventBus};
use crate::protocol::ServerEvent;
use crate::registry::SessionRegistry;
use crate::session::{SessionError, SessionId};
use chessduel_engine::{MoveDescriptor, TerminalReason};

#[derive(Debug)]
pub enum MoveOutcome {
    /// Move accepted and relayed to both participants.
    Applied { terminal: Option<TerminalReason> },
    /// Move refused; only the sender was told.
    Rejected(SessionError),
    /// Nothing to relay to: the event was dropped.
    Dropped(SessionError),
}

/// Validate a move for `requester` and relay it to the session's room.
///
/// Out-of-turn and illegal moves (including payloads that are not a
/// `{from, to, promotion?}` object) are echoed back to the sender as
/// `invalidMove` and change nothing. Accepted moves are broadcast together with
/// the new position, followed by `gameOver` when the move ended the game.
pub fn submit_move(
    registry: &mut SessionRegistry,
    bus: &EventBus,
    session_id: &SessionId,
    requester: ConnectionId,
    payload: &serde_json::Value,
) -> MoveOutcome {
    let Some(session) = registry.get_mut(session_id) else {
        return MoveOutcome::Dropped(SessionError::NotFound(session_id.clone()));
    };

    let side = match session.ensure_turn(requester) {
        Ok(side) => side,
        Err(err @ SessionError::NotYourTurn { .. }) => return reject(bus, requester, payload, err),
        Err(err) => return MoveOutcome::Dropped(err),
    };

    let descriptor = match serde_json::from_value::<MoveDescriptor>(payload.clone()) {
        Ok(descriptor) => descriptor,
        Err(err) => {
            return reject(
                bus,
                requester,
                payload,
                SessionError::MalformedMove(err.to_string()),
            )
        }
    };

    let terminal = match session.apply_move(requester, &descriptor) {
        Ok(terminal) => terminal,
        Err(err) => return reject(bus, requester, payload, err),
    };

    tracing::debug!(
        session_id = %session_id,
        side = %side,
        from = %descriptor.from,
        to = %descriptor.to,
        "move accepted"
    );

    bus.broadcast(session_id, ServerEvent::Move(descriptor));
    bus.broadcast(session_id, ServerEvent::BoardState(session.position()));

    if let Some(reason) = terminal {
        tracing::info!(session_id = %session_id, reason = ?reason, "game reached a terminal position");
        bus.broadcast(session_id, ServerEvent::GameOver(reason.message()));
    }

    MoveOutcome::Applied { terminal }
}

fn reject(
    bus: &EventBus,
    requester: ConnectionId,
    payload: &serde_json::Value,
    err: SessionError,
) -> MoveOutcome {
    tracing::warn!(connection_id = %requester, error = %err, "invalid move");
    bus.send(requester, ServerEvent::InvalidMove(payload.clone()));
    MoveOutcome::Rejected(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Attachment;
    use crate::testing::{drain, ScriptedEngine};
    use chessduel_engine::{Side, StandardChess};
    use serde_json::json;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    struct Table {
        registry: SessionRegistry,
        bus: EventBus,
        id: SessionId,
        white: Attachment,
        black: Attachment,
    }

    fn table_with(engine: Box<dyn chessduel_engine::RulesEngine>) -> Table {
        let bus = EventBus::new();
        let white = bus.attach(ConnectionId::new());
        let black = bus.attach(ConnectionId::new());
        let mut registry = SessionRegistry::new();
        let id = registry
            .create_session(white.connection_id(), black.connection_id(), engine)
            .expect("create")
            .id()
            .clone();
        bus.join(&id, white.connection_id());
        bus.join(&id, black.connection_id());
        Table {
            registry,
            bus,
            id,
            white,
            black,
        }
    }

    fn table() -> Table {
        table_with(Box::new(StandardChess::new()))
    }

    fn submit(table: &mut Table, who: ConnectionId, payload: serde_json::Value) -> MoveOutcome {
        submit_move(&mut table.registry, &table.bus, &table.id, who, &payload)
    }

    fn position(table: &Table) -> String {
        table.registry.get(&table.id).expect("session").position()
    }

    #[test]
    fn accepted_move_is_broadcast_with_board_state() {
        let mut t = table();
        let white = t.white.connection_id();

        let outcome = submit(&mut t, white, json!({"from": "e2", "to": "e4"}));
        assert!(matches!(outcome, MoveOutcome::Applied { terminal: None }));

        let expected = vec![
            ServerEvent::Move(MoveDescriptor::new("e2", "e4")),
            ServerEvent::BoardState(
                "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".into(),
            ),
        ];
        assert_eq!(drain(&mut t.white), expected);
        assert_eq!(drain(&mut t.black), expected);
    }

    #[test]
    fn out_of_turn_move_is_reported_to_sender_only() {
        let mut t = table();
        let black = t.black.connection_id();
        let payload = json!({"from": "e7", "to": "e5"});

        let outcome = submit(&mut t, black, payload.clone());
        assert!(matches!(
            outcome,
            MoveOutcome::Rejected(SessionError::NotYourTurn { expected: Side::White })
        ));
        assert_eq!(drain(&mut t.black), vec![ServerEvent::InvalidMove(payload)]);
        assert!(drain(&mut t.white).is_empty());
        assert_eq!(position(&t), START_FEN);
    }

    #[test]
    fn illegal_move_on_own_turn_is_reported_to_sender_only() {
        let mut t = table();
        let white = t.white.connection_id();
        let black = t.black.connection_id();
        submit(&mut t, white, json!({"from": "e2", "to": "e4"}));
        drain(&mut t.white);
        drain(&mut t.black);
        let before = position(&t);

        let payload = json!({"from": "e2", "to": "e4"});
        let outcome = submit(&mut t, black, payload.clone());

        assert!(matches!(
            outcome,
            MoveOutcome::Rejected(SessionError::IllegalMove(_))
        ));
        assert_eq!(drain(&mut t.black), vec![ServerEvent::InvalidMove(payload)]);
        assert!(drain(&mut t.white).is_empty());
        assert_eq!(position(&t), before);
    }

    #[test]
    fn malformed_payload_is_echoed_back() {
        let mut t = table();
        let white = t.white.connection_id();
        let payload = json!("e2e4");

        let outcome = submit(&mut t, white, payload.clone());
        assert!(matches!(
            outcome,
            MoveOutcome::Rejected(SessionError::MalformedMove(_))
        ));
        assert_eq!(drain(&mut t.white), vec![ServerEvent::InvalidMove(payload)]);
        assert_eq!(position(&t), START_FEN);
    }

    #[test]
    fn checkmate_names_the_side_that_delivered_it() {
        let mut t = table();
        let white = t.white.connection_id();
        let black = t.black.connection_id();
        for (who, from, to) in [(white, "f2", "f3"), (black, "e7", "e5"), (white, "g2", "g4")] {
            submit(&mut t, who, json!({"from": from, "to": to}));
        }
        drain(&mut t.white);

        let outcome = submit(&mut t, black, json!({"from": "d8", "to": "h4"}));
        assert!(matches!(
            outcome,
            MoveOutcome::Applied {
                terminal: Some(TerminalReason::Checkmate { winner: Side::Black })
            }
        ));
        let events = drain(&mut t.white);
        assert_eq!(
            events.last(),
            Some(&ServerEvent::GameOver("Checkmate! Black wins.".into()))
        );
    }

    #[test]
    fn finished_game_still_accepts_moves_from_engine() {
        let mut t = table_with(Box::new(ScriptedEngine::terminal_after_first_move(
            TerminalReason::Other,
        )));
        let white = t.white.connection_id();
        let black = t.black.connection_id();

        let first = submit(&mut t, white, json!({"from": "a2", "to": "a3"}));
        assert!(matches!(
            first,
            MoveOutcome::Applied {
                terminal: Some(TerminalReason::Other)
            }
        ));
        assert_eq!(
            drain(&mut t.black).last(),
            Some(&ServerEvent::GameOver("Game over.".into()))
        );

        let second = submit(&mut t, black, json!({"from": "a7", "to": "a6"}));
        assert!(matches!(second, MoveOutcome::Applied { .. }));
    }

    #[test]
    fn unknown_session_is_dropped_silently() {
        let mut t = table();
        let white = t.white.connection_id();
        let outcome = submit_move(
            &mut t.registry,
            &t.bus,
            &"game_missing".to_string(),
            white,
            &json!({"from": "e2", "to": "e4"}),
        );
        assert!(matches!(
            outcome,
            MoveOutcome::Dropped(SessionError::NotFound(_))
        ));
        assert!(drain(&mut t.white).is_empty());
    }

    #[test]
    fn outsider_move_is_dropped_silently() {
        let mut t = table();
        let mut outsider = t.bus.attach(ConnectionId::new());
        let outcome = submit(
            &mut t,
            outsider.connection_id(),
            json!({"from": "e2", "to": "e4"}),
        );
        assert!(matches!(
            outcome,
            MoveOutcome::Dropped(SessionError::NotParticipant(_))
        ));
        assert!(drain(&mut outsider).is_empty());
        assert_eq!(position(&t), START_FEN);
    }
}
