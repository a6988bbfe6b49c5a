use crate::events::{ConnectionId, EventReceiver};
use crate::protocol::ClientEvent;
use crate::router::ConnectionEventRouter;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use warp::ws::{Message, WebSocket};

/// Drive one upgraded WebSocket until either side goes away.
///
/// The outbound channel is attached before the router sees the connection so
/// that `waitingForOpponent` or the pairing events are never lost.
pub async fn serve_connection(socket: WebSocket, router: Arc<ConnectionEventRouter>) {
    let connection_id = ConnectionId::new();
    let mut attachment = router.event_bus().attach(connection_id);
    tracing::info!(connection_id = %connection_id, "websocket connected");

    if let Err(err) = router.on_connect(connection_id) {
        tracing::error!(connection_id = %connection_id, error = %err, "failed to register connection");
        return;
    }

    let (sink, stream) = socket.split();

    tokio::select! {
        _ = write_events(connection_id, attachment.receiver(), sink) => {
            tracing::debug!(connection_id = %connection_id, "outbound side finished");
        }
        _ = read_events(connection_id, stream, &router) => {
            tracing::debug!(connection_id = %connection_id, "inbound side finished");
        }
    }

    if let Err(err) = router.on_disconnect(connection_id) {
        tracing::error!(connection_id = %connection_id, error = %err, "failed to release connection");
    }
    drop(attachment);
    tracing::info!(connection_id = %connection_id, "websocket disconnected");
}

async fn write_events(
    connection_id: ConnectionId,
    receiver: &mut EventReceiver,
    mut sink: SplitSink<WebSocket, Message>,
) {
    // `recv` yields None once the bus has dropped our sender, e.g. after an
    // overflowing buffer.
    while let Some(event) = receiver.recv().await {
        let text = match event.encode() {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(connection_id = %connection_id, event = event.name(), error = %err, "failed to encode event");
                continue;
            }
        };
        if let Err(err) = sink.send(Message::text(text)).await {
            tracing::debug!(connection_id = %connection_id, error = %err, "websocket send failed");
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_events(
    connection_id: ConnectionId,
    mut stream: SplitStream<WebSocket>,
    router: &ConnectionEventRouter,
) {
    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(connection_id = %connection_id, error = %err, "websocket read failed");
                break;
            }
        };

        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            // binary, ping and pong frames carry no game events
            continue;
        };

        match ClientEvent::decode(text) {
            Ok(event) => {
                if let Err(err) = router.on_event(connection_id, event) {
                    tracing::error!(connection_id = %connection_id, error = %err, "event handling failed, closing");
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(connection_id = %connection_id, error = %err, "undecodable client frame ignored");
            }
        }
    }
}
