use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::app::{AppState, Snapshot};

/// Messages pushed to Web-GUI clients.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", content = "payload")]
pub enum WsMessage {
    /// Sent once on connect to bootstrap the client UI.
    Initial(Snapshot),
    /// Sent on every session state change.
    Status(Snapshot),
}

/// Gets called for every new web client and spins up an event loop
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(AppState {
        ws_tx, session, ..
    }): State<AppState>,
) -> impl IntoResponse {
    let current = session.snapshot();
    ws.on_upgrade(move |socket| start_webui_ws_loop(socket, ws_tx.subscribe(), current))
}

async fn send_ws_message(socket: &mut WebSocket, msg: &WsMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!("Failed to serialize websocket message: {}", e);
            Err(axum::Error::new(e))
        }
    }
}

/// One event loop per connected client.
async fn start_webui_ws_loop(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<WsMessage>,
    current: Snapshot,
) {
    if let Err(e) = send_ws_message(&mut socket, &WsMessage::Initial(current)).await {
        warn!("Failed to send initial state: {}", e);
        return;
    }

    loop {
        tokio::select! {
            // Receive messages from the broadcast channel
            msg = rx.recv() => {
                match msg {
                    Ok(msg) => {
                        if let Err(e) = send_ws_message(&mut socket, &msg).await {
                            warn!("Failed to send message, closing connection: {}", e);
                            break;
                        }
                    }
                    Err(_) => {
                        warn!("Broadcast channel closed, stopping WebSocket handler");
                        break;
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Clients don't send anything we act on
                    Some(Ok(_)) => {}
                    None | Some(Err(_)) => {
                        info!("WebSocket connection closed");
                        break;
                    }
                }
            }
        }
    }
}
