// src/realtime/handlers.rs

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::common::{generate_connection_id, AppState};
use crate::realtime::channels::ChannelRegistry;
use crate::realtime::models::{ClientCommand, ServerEvent};

/// GET /ws - WebSocket upgrade for the new-response notification channel.
/// Joining is caller-initiated and independent of the HTTP request/response
/// lifecycle; the events carry no response content.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    let channels = state_lock.read().await.channels.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, channels))
}

async fn handle_socket(socket: WebSocket, channels: ChannelRegistry) {
    let connection_id = generate_connection_id();

    info!(connection_id = %connection_id, "Realtime connection established");

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Channel feeding outbound frames to this connection; the registry holds
    // a clone of tx for every joined survey channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let recv_channels = channels.clone();
    let recv_connection_id = connection_id.clone();
    let recv_tx = tx.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_command(&text, &recv_connection_id, &recv_channels, &recv_tx).await;
                }
                Message::Close(_) => break,
                // axum answers protocol-level pings automatically
                _ => {}
            }
        }
    });

    // Whichever task finishes first tears the connection down
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    channels.leave_all(&connection_id).await;

    info!(connection_id = %connection_id, "Realtime connection closed");
}

async fn handle_command(
    text: &str,
    connection_id: &str,
    channels: &ChannelRegistry,
    tx: &mpsc::UnboundedSender<Message>,
) {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            debug!(
                connection_id = %connection_id,
                error = %e,
                "Ignoring unparseable realtime frame"
            );
            send_event(
                tx,
                ServerEvent::Error {
                    code: "BAD_FRAME".to_string(),
                    message: "Unrecognized message".to_string(),
                },
            );
            return;
        }
    };

    match command {
        ClientCommand::Join { survey_id } => {
            channels.join(&survey_id, connection_id, tx.clone()).await;
            send_event(tx, ServerEvent::Joined { survey_id });
        }
        ClientCommand::Leave { survey_id } => {
            channels.leave(&survey_id, connection_id).await;
            send_event(tx, ServerEvent::Left { survey_id });
        }
        ClientCommand::Ping => {
            send_event(tx, ServerEvent::Pong);
        }
    }
}

fn send_event(tx: &mpsc::UnboundedSender<Message>, event: ServerEvent) {
    match serde_json::to_string(&event) {
        Ok(json) => {
            let _ = tx.send(Message::Text(json));
        }
        Err(e) => warn!(error = %e, "Failed to serialize realtime event"),
    }
}
