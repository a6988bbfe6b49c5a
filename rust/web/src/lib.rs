//! Two-player chess over WebSockets.
//!
//! Connections are paired first-come first-served into sessions. Each
//! session owns a rules engine, relays legal moves between its two
//! participants and lets them end the game by mutual agreement. The HTTP
//! side only serves static assets, a health check and lobby occupancy.

pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod matchmaking;
pub mod negotiation;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod router;
pub mod server;
pub mod session;

#[cfg(test)]
mod testing;

pub use errors::{ErrorResponse, IntoErrorResponse};
pub use events::{Attachment, ConnectionId, EventBus, DEFAULT_OUTBOUND_BUFFER};
pub use logging::{init_logging, CapturedLogs, LogEntry, LogFormat};
pub use matchmaking::{Enqueued, MatchmakingQueue};
pub use negotiation::{NegotiationOutcome, MUTUAL_AGREEMENT_MESSAGE};
pub use protocol::{ClientEvent, ProtocolError, ServerEvent};
pub use registry::SessionRegistry;
pub use relay::MoveOutcome;
pub use router::{ConnectionEventRouter, LobbySnapshot, SessionView};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{GameSession, Participants, SessionError, SessionId, SessionStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_shares_one_event_bus_with_the_router() {
        let ctx = AppContext::new_for_tests();

        let attachment = ctx.event_bus().attach(ConnectionId::new());
        assert_eq!(ctx.router().event_bus().connection_count(), 1);
        drop(attachment);
        assert_eq!(ctx.event_bus().connection_count(), 0);
        assert_eq!(ctx.router().snapshot().unwrap().active_sessions, 0);
    }
}
