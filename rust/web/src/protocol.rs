//! JSON wire format spoken over the game WebSocket.
//!
//! Every frame is a text message shaped like `{"event": "<name>", "data": <payload>}`.
//! Events without a payload omit `data`.

use chessduel_engine::{MoveDescriptor, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Events a client may send. Connect and disconnect come from the transport itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Raw payload, kept as-is so a rejected move can be echoed back verbatim.
    Move(serde_json::Value),
    RequestEndGame,
    RespondEndGame(bool),
}

impl ClientEvent {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Move(_) => "move",
            ClientEvent::RequestEndGame => "requestEndGame",
            ClientEvent::RespondEndGame(_) => "respondEndGame",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    WaitingForOpponent,
    StartGame,
    PlayerRole(Side),
    /// Serialized position (FEN)
    BoardState(String),
    Move(MoveDescriptor),
    InvalidMove(serde_json::Value),
    GameOver(String),
    OpponentRequestedEndGame,
    EndGameDeclined,
    GameEnded(String),
    OpponentDisconnected,
}

impl ServerEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::WaitingForOpponent => "waitingForOpponent",
            ServerEvent::StartGame => "startGame",
            ServerEvent::PlayerRole(_) => "playerRole",
            ServerEvent::BoardState(_) => "boardState",
            ServerEvent::Move(_) => "move",
            ServerEvent::InvalidMove(_) => "invalidMove",
            ServerEvent::GameOver(_) => "gameOver",
            ServerEvent::OpponentRequestedEndGame => "opponentRequestedEndGame",
            ServerEvent::EndGameDeclined => "endGameDeclined",
            ServerEvent::GameEnded(_) => "gameEnded",
            ServerEvent::OpponentDisconnected => "opponentDisconnected",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to decode client frame: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Failed to encode server event: {0}")]
    Encode(#[source] serde_json::Error),
}
