//! WebSocket support for the live crash round
//!
//! Viewers connect, get a one-time state snapshot, then ride the engine's
//! broadcast: countdown ticks, launch, multiplier ticks, bets, cashouts,
//! and the crash. The stream is spectator-only; bets and cashouts go over
//! HTTP. A viewer that falls behind the broadcast buffer is resynced with
//! a fresh snapshot instead of being disconnected.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::handlers::AppState;
use super::monitoring::MetricsRegistry;

/// Upgrade to a crash round subscription
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    MetricsRegistry::incr(&state.metrics.websocket_connections_active);
    if let Err(err) = serve_viewer(socket, &state).await {
        debug!(%err, "websocket closed");
    }
    MetricsRegistry::decr(&state.metrics.websocket_connections_active);
}

async fn serve_viewer(socket: WebSocket, state: &Arc<AppState>) -> Result<(), axum::Error> {
    // Subscribe before snapshotting so no event falls in the gap.
    let (mut events, snapshot) = {
        let engine = state.engine.lock().await;
        (engine.subscribe(), engine.snapshot())
    };

    let (mut sink, mut stream) = socket.split();
    send_json(&mut sink, &snapshot, state).await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => send_json(&mut sink, &event, state).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket viewer lagged, resyncing");
                    let snapshot = state.engine.lock().await.snapshot();
                    send_json(&mut sink, &snapshot, state).await?;
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(payload))) => {
                    sink.send(Message::Pong(payload)).await?;
                }
                // The stream is one-way; anything else is ignored.
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err),
            },
        }
    }
    Ok(())
}

async fn send_json<T: serde::Serialize>(
    sink: &mut SplitSink<WebSocket, Message>,
    payload: &T,
    state: &Arc<AppState>,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(payload).map_err(axum::Error::new)?;
    sink.send(Message::Text(text)).await?;
    MetricsRegistry::incr(&state.metrics.websocket_messages_sent);
    Ok(())
}
