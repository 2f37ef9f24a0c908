//! Per-connection handler: routing, matchmaking, and frame pumping.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Finish the WebSocket upgrade, bounded by the handshake timeout
//!   2. Parse the request target into a [`Route`]; close on failure
//!   3. Spawn a writer task draining this connection's outbox
//!   4. Attach to the matchmaker and issue the route's intent
//!   5. Loop: receive frames → in-band intents go to the matchmaker as
//!      requests, everything else is handed over for relaying

use std::sync::Arc;

use knightlink_match::{MatchError, MatchOutcome, MatchmakerHandle, Peer};
use knightlink_protocol::{Message, decode};
use knightlink_transport::{
    Connection, ConnectionId, Incoming, IncomingWebSocket, WebSocketConnection,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{KnightlinkError, Route};

/// Drop guard that detaches the connection when the handler exits.
///
/// Runs on every exit path, panics included. `Drop` is synchronous, so the
/// detach is sent from a spawned task.
struct DetachGuard {
    id: ConnectionId,
    matchmaker: MatchmakerHandle,
    writer: JoinHandle<()>,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        // Stopping the writer closes the outbox, so the peer reads as gone
        // even before the detach is processed.
        self.writer.abort();

        let id = self.id;
        let matchmaker = self.matchmaker.clone();
        tokio::spawn(async move {
            let _ = matchmaker.detach(id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    incoming: IncomingWebSocket,
    matchmaker: MatchmakerHandle,
) -> Result<(), KnightlinkError> {
    let conn = incoming.upgrade().await?;
    let id = conn.id();

    let Some(route) = Route::parse(conn.request_target()) else {
        tracing::info!(%id, target = conn.request_target(), "rejecting unknown route");
        conn.close().await?;
        return Ok(());
    };
    tracing::debug!(%id, ?route, "handling new connection");

    let conn = Arc::new(conn);
    let (outbox, frames) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_frames(Arc::clone(&conn), frames));
    let _guard = DetachGuard {
        id,
        matchmaker: matchmaker.clone(),
        writer,
    };

    matchmaker
        .attach(Peer::new(id, route.identity().clone(), outbox))
        .await?;

    let outcome = match &route {
        Route::Random { .. } => matchmaker.request_random(id, None).await,
        Route::Room { code, .. } => {
            matchmaker.announce_or_join(id, code.clone(), None).await
        }
    };
    log_refusal(id, outcome)?;

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(%id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%id, error = %e, "recv error");
                break;
            }
        };

        let message = match decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(%id, error = %e, "ignoring malformed frame");
                continue;
            }
        };

        match message {
            Message::QueueRandom { client_id } => {
                log_refusal(id, matchmaker.request_random(id, client_id).await)?;
            }
            Message::JoinRoom { room_id, client_id } => {
                let outcome = matchmaker.announce_or_join(id, room_id, client_id).await;
                log_refusal(id, outcome)?;
            }
            other => matchmaker.forward(id, other, frame).await?,
        }
    }

    // _guard drops here → writer stops, detach fires.
    Ok(())
}

/// Refused intents are logged and the connection stays open. Only a
/// vanished matchmaker ends the handler.
fn log_refusal(
    id: ConnectionId,
    outcome: Result<MatchOutcome, MatchError>,
) -> Result<(), KnightlinkError> {
    match outcome {
        Ok(outcome) => {
            tracing::debug!(%id, ?outcome, "intent accepted");
            Ok(())
        }
        Err(MatchError::Unavailable) => Err(MatchError::Unavailable.into()),
        Err(e) => {
            tracing::debug!(%id, error = %e, "intent refused");
            Ok(())
        }
    }
}

/// Drains the outbox onto the socket.
///
/// When every sender is gone (the matchmaker shut down) the connection is
/// closed so the client notices.
async fn write_frames(
    conn: Arc<WebSocketConnection>,
    mut frames: mpsc::UnboundedReceiver<String>,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(id = %conn.id(), error = %e, "send failed, stopping writer");
            return;
        }
    }
    let _ = conn.close().await;
}
