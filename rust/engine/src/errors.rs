use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(String),
    #[error("Illegal move from {from} to {to}")]
    Illegal { from: String, to: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("Malformed FEN `{fen}`: {reason}")]
    InvalidFen { fen: String, reason: String },
    #[error("FEN `{fen}` does not describe a legal position: {reason}")]
    IllegalPosition { fen: String, reason: String },
}
