use crate::errors::MoveError;
use crate::moves::MoveDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The two sides of a board. Serialized with the single-letter codes clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl Side {
    pub fn code(self) -> &'static str {
        match self {
            Side::White => "w",
            Side::Black => "b",
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("White"),
            Side::Black => f.write_str("Black"),
        }
    }
}

/// Why a game instance stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalReason {
    Checkmate { winner: Side },
    Draw,
    /// For engines that tell stalemate apart; `StandardChess` reports it as `Draw`.
    Stalemate,
    Other,
}

impl TerminalReason {
    /// Human-readable announcement sent to both players.
    pub fn message(&self) -> String {
        match self {
            TerminalReason::Checkmate { winner } => format!("Checkmate! {winner} wins."),
            TerminalReason::Draw => "Game ended in a draw.".to_string(),
            TerminalReason::Stalemate => "Game ended in a stalemate.".to_string(),
            TerminalReason::Other => "Game over.".to_string(),
        }
    }
}

/// Capability a game session needs from a board-game rules implementation.
///
/// Sessions never inspect the position themselves; everything goes through
/// this trait so tests can swap in scripted engines.
pub trait RulesEngine: Send + fmt::Debug {
    /// Side whose move it is.
    fn current_turn(&self) -> Side;

    /// Validate and apply a move. The position is untouched on error.
    fn apply_move(&mut self, mv: &MoveDescriptor) -> Result<(), MoveError>;

    fn is_terminal(&self) -> bool;

    /// `None` while the game is still in progress.
    fn terminal_reason(&self) -> Option<TerminalReason>;

    /// Compact serialization of the full position (FEN for chess).
    fn serialize_position(&self) -> String;

    /// Restore the initial position.
    fn reset(&mut self);
}

/// Produces a fresh engine at the initial position for every new session.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn RulesEngine> + Send + Sync>;

/// Factory for standard chess from the usual starting position.
pub fn standard_factory() -> EngineFactory {
    Arc::new(|| Box::new(crate::chess::StandardChess::new()) as Box<dyn RulesEngine>)
}
