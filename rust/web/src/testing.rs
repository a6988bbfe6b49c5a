//! Shared helpers for unit tests.

use crate::events::Attachment;
use crate::protocol::ServerEvent;
use chessduel_engine::{MoveDescriptor, MoveError, RulesEngine, Side, TerminalReason};

/// Collect every event currently queued for a connection.
pub fn drain(attachment: &mut Attachment) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = attachment.receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Rules engine with no board: any move whose origin differs from its
/// destination is legal, and the game can be told to end after N plies.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    turn: Side,
    plies: usize,
    terminal_from_ply: Option<usize>,
    reason: TerminalReason,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            turn: Side::White,
            plies: 0,
            terminal_from_ply: None,
            reason: TerminalReason::Other,
        }
    }

    pub fn terminal_after_first_move(reason: TerminalReason) -> Self {
        Self {
            terminal_from_ply: Some(1),
            reason,
            ..Self::new()
        }
    }
}

impl RulesEngine for ScriptedEngine {
    fn current_turn(&self) -> Side {
        self.turn
    }

    fn apply_move(&mut self, mv: &MoveDescriptor) -> Result<(), MoveError> {
        if mv.from == mv.to {
            return Err(MoveError::Illegal {
                from: mv.from.clone(),
                to: mv.to.clone(),
            });
        }
        self.plies += 1;
        self.turn = self.turn.opposite();
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.terminal_from_ply
            .is_some_and(|ply| self.plies >= ply)
    }

    fn terminal_reason(&self) -> Option<TerminalReason> {
        self.is_terminal().then_some(self.reason)
    }

    fn serialize_position(&self) -> String {
        format!("scripted {} {}", self.plies, self.turn.code())
    }

    fn reset(&mut self) {
        self.plies = 0;
        self.turn = Side::White;
    }
}
