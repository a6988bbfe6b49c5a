use crate::errors::MoveError;
use serde::{Deserialize, Serialize};
use shakmaty::{Role, Square};

/// A move as submitted by a client: origin and destination squares in
/// algebraic notation, plus an optional promotion piece code (`q`, `r`, `b`, `n`).
///
/// # Examples
///
/// ```
/// use chessduel_engine::moves::MoveDescriptor;
///
/// let mv = MoveDescriptor::new("e2", "e4");
/// assert_eq!(mv.from, "e2");
/// assert!(mv.promotion.is_none());
///
/// let promo = MoveDescriptor::new("a7", "a8").with_promotion("q");
/// assert_eq!(promo.promotion.as_deref(), Some("q"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDescriptor {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl MoveDescriptor {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece: impl Into<String>) -> Self {
        self.promotion = Some(piece.into());
        self
    }

    pub(crate) fn from_square(&self) -> Result<Square, MoveError> {
        parse_square(&self.from)
    }

    pub(crate) fn to_square(&self) -> Result<Square, MoveError> {
        parse_square(&self.to)
    }

    /// Promotion role, if one was supplied. Only minor and major pieces qualify.
    pub(crate) fn promotion_role(&self) -> Result<Option<Role>, MoveError> {
        let Some(code) = self.promotion.as_deref() else {
            return Ok(None);
        };
        let mut chars = code.chars();
        let role = match (chars.next(), chars.next()) {
            (Some(ch), None) => Role::from_char(ch.to_ascii_lowercase()),
            _ => None,
        };
        match role {
            Some(Role::Queen | Role::Rook | Role::Bishop | Role::Knight) => Ok(role),
            _ => Err(MoveError::InvalidPromotion(code.to_string())),
        }
    }
}

/// Squares are matched exactly: lowercase file then rank, no padding.
fn parse_square(raw: &str) -> Result<Square, MoveError> {
    let exact = raw.len() == 2 && raw.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !exact {
        return Err(MoveError::InvalidSquare(raw.to_string()));
    }
    raw.parse::<Square>()
        .map_err(|_| MoveError::InvalidSquare(raw.to_string()))
}
