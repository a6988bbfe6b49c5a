//! # chessduel-engine: Rules Engine Collaborator
//!
//! Everything the session layer needs to know about the board game lives
//! behind the [`rules::RulesEngine`] trait: whose turn it is, whether a move
//! is legal, whether the game has ended and why, and how to serialize the
//! position for clients.
//!
//! ## Core Modules
//!
//! - [`rules`] - The `RulesEngine` trait, `Side`, `TerminalReason` and engine factories
//! - [`chess`] - `StandardChess`, the `shakmaty`-backed implementation
//! - [`moves`] - `MoveDescriptor`, the client-facing move shape
//! - [`errors`] - Error types for move application and position loading
//!
//! ## Quick Start
//!
//! ```rust
//! use chessduel_engine::moves::MoveDescriptor;
//! use chessduel_engine::rules::{standard_factory, Side};
//!
//! let factory = standard_factory();
//! let mut engine = factory();
//!
//! assert_eq!(engine.current_turn(), Side::White);
//! engine.apply_move(&MoveDescriptor::new("e2", "e4")).expect("legal opening");
//! assert_eq!(engine.current_turn(), Side::Black);
//!
//! // Black cannot move a white pawn
//! assert!(engine.apply_move(&MoveDescriptor::new("d2", "d4")).is_err());
//! ```

pub mod chess;
pub mod errors;
pub mod moves;
pub mod rules;

pub use chess::StandardChess;
pub use errors::{MoveError, PositionError};
pub use moves::MoveDescriptor;
pub use rules::{standard_factory, EngineFactory, RulesEngine, Side, TerminalReason};
