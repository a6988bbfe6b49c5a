use crate::errors::{MoveError, PositionError};
use crate::moves::MoveDescriptor;
use crate::rules::{RulesEngine, Side, TerminalReason};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};
use std::collections::HashMap;

/// Halfmove clock value at which the fifty-move rule applies.
const FIFTY_MOVE_HALFMOVES: u32 = 100;
const REPETITION_LIMIT: u8 = 3;

/// Standard chess rules backed by `shakmaty`.
///
/// On top of the position itself this tracks how often each position has
/// occurred so threefold repetition can be reported as a draw.
///
/// # Examples
///
/// ```
/// use chessduel_engine::chess::StandardChess;
/// use chessduel_engine::moves::MoveDescriptor;
/// use chessduel_engine::rules::{RulesEngine, Side};
///
/// let mut game = StandardChess::new();
/// game.apply_move(&MoveDescriptor::new("e2", "e4")).expect("legal");
/// assert_eq!(game.current_turn(), Side::Black);
/// assert!(game.serialize_position().starts_with("rnbqkbnr/pppppppp/8/8/4P3/"));
/// ```
#[derive(Debug, Clone)]
pub struct StandardChess {
    /// Position the engine returns to on `reset`
    initial: Chess,
    position: Chess,
    /// Occurrence count per repetition key
    seen: HashMap<String, u8>,
}

impl Default for StandardChess {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardChess {
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    /// Start from an arbitrary position. `reset` returns to this position.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let parsed: Fen = fen.parse().map_err(|err: shakmaty::fen::ParseFenError| {
            PositionError::InvalidFen {
                fen: fen.to_string(),
                reason: err.to_string(),
            }
        })?;
        let position: Chess = parsed.into_position(CastlingMode::Standard).map_err(|err| {
            PositionError::IllegalPosition {
                fen: fen.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self::from_position(position))
    }

    fn from_position(position: Chess) -> Self {
        let mut engine = Self {
            initial: position.clone(),
            position,
            seen: HashMap::new(),
        };
        engine.record_occurrence();
        engine
    }

    fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Board, side to move, castling rights and en passant square. The move
    /// counters are left out so identical positions compare equal.
    fn repetition_key(&self) -> String {
        self.fen()
            .split(' ')
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn record_occurrence(&mut self) {
        let key = self.repetition_key();
        *self.seen.entry(key).or_insert(0) += 1;
    }

    fn is_threefold_repetition(&self) -> bool {
        self.seen
            .get(&self.repetition_key())
            .is_some_and(|count| *count >= REPETITION_LIMIT)
    }

    /// Stalemate counts as a draw, like every other no-winner ending.
    fn is_draw(&self) -> bool {
        self.position.is_stalemate()
            || self.position.is_insufficient_material()
            || self.position.halfmoves() >= FIFTY_MOVE_HALFMOVES
            || self.is_threefold_repetition()
    }

    /// Resolve a client descriptor against the legal moves of the position.
    ///
    /// The promotion code is only consulted when the move cannot be played
    /// without one, so a code on a move that does not promote is ignored.
    fn resolve(&self, mv: &MoveDescriptor) -> Result<Move, MoveError> {
        let from = mv.from_square()?;
        let to = mv.to_square()?;

        let illegal = || MoveError::Illegal {
            from: mv.from.clone(),
            to: mv.to.clone(),
        };

        let plain = UciMove::Normal {
            from,
            to,
            promotion: None,
        };
        if let Ok(found) = plain.to_move(&self.position) {
            return Ok(found);
        }

        let Some(promotion) = mv.promotion_role()? else {
            return Err(illegal());
        };
        UciMove::Normal {
            from,
            to,
            promotion: Some(promotion),
        }
        .to_move(&self.position)
        .map_err(|_| illegal())
    }
}

impl RulesEngine for StandardChess {
    fn current_turn(&self) -> Side {
        match self.position.turn() {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }

    fn apply_move(&mut self, mv: &MoveDescriptor) -> Result<(), MoveError> {
        let resolved = self.resolve(mv)?;
        self.position.play_unchecked(&resolved);
        self.record_occurrence();
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.position.is_checkmate() || self.is_draw()
    }

    fn terminal_reason(&self) -> Option<TerminalReason> {
        if self.position.is_checkmate() {
            // The side to move is the one that has been mated.
            Some(TerminalReason::Checkmate {
                winner: self.current_turn().opposite(),
            })
        } else if self.is_draw() {
            Some(TerminalReason::Draw)
        } else {
            None
        }
    }

    fn serialize_position(&self) -> String {
        self.fen()
    }

    fn reset(&mut self) {
        self.position = self.initial.clone();
        self.seen.clear();
        self.record_occurrence();
    }
}
