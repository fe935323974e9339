use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use crate::session::decode_client_msg;
use crate::shard_loop::{ShardCommand, ShardRouter};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub router: ShardRouter,
    pub connection_semaphore: Arc<Semaphore>,
    pub max_message_size: usize,
    pub outbox_capacity: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let Ok(permit) = app_state.connection_semaphore.clone().try_acquire_owned() else {
        tracing::warn!("Connection limit reached, rejecting client");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    ws.max_message_size(app_state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, app_state, permit))
        .into_response()
}

async fn handle_socket(socket: WebSocket, app_state: AppState, _permit: OwnedSemaphorePermit) {
    let (mut sink, mut stream) = socket.split();
    let (conn, shard_index, shard_tx) = app_state.router.assign();
    let (outbox_tx, mut outbox_rx) = mpsc::channel(app_state.outbox_capacity);

    if shard_tx
        .send(ShardCommand::Connect {
            conn,
            outbox: outbox_tx,
        })
        .await
        .is_err()
    {
        tracing::error!(conn, shard = shard_index, "Shard is gone, dropping connection");
        return;
    }
    tracing::info!(conn, shard = shard_index, "Client connected");

    loop {
        tokio::select! {
            // Client -> Shard
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match decode_client_msg(text.as_str(),app_state.max_message_size) {
                            Ok(msg) => {
                                if shard_tx.send(ShardCommand::Message { conn, msg }).await.is_err() {
                                    tracing::warn!(conn, "Shard closed");
                                    break;
                                }
                            }
                            Err(e) => tracing::debug!(conn, error = %e, "Dropped inbound frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(conn, error = %e, "Socket error");
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Shard -> Client
            out = outbox_rx.recv() => {
                let Some(msg) = out else { break };
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(conn, error = %e, "Failed to encode message"),
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = shard_tx.send(ShardCommand::Disconnect { conn }).await;
    tracing::info!(conn, shard = shard_index, "Client disconnected");
}
