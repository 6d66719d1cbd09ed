//! WebSocket bridge between the browser and the listener

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use super::UiState;
use crate::assistant::{ListenerRequest, Presenter};

/// Incoming WebSocket message from the browser
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsIncoming {
    /// The page finished loading; unblocks the listener
    FrontendReady,
    /// Microphone button pressed
    Mic,
    /// Typed command
    Command { text: String },
    /// Ping to keep connection alive
    Ping,
}

/// Outgoing WebSocket message to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    /// Text to show in the message area
    DisplayMessage { text: String },
    /// Return to the resting animation
    ShowIdle,
    /// Capturing an utterance
    Listening,
    /// Pong response
    Pong,
    /// Connection established
    Connected {
        connection_id: String,
        assistant_name: String,
    },
    /// Error
    Error { code: String, message: String },
}

/// Presenter that broadcasts to every connected browser
///
/// Sends never block; with no browser connected the event is dropped.
#[derive(Debug, Clone)]
pub struct UiPresenter {
    events: broadcast::Sender<WsOutgoing>,
}

impl UiPresenter {
    #[must_use]
    pub const fn new(events: broadcast::Sender<WsOutgoing>) -> Self {
        Self { events }
    }

    fn publish(&self, event: WsOutgoing) {
        if self.events.send(event).is_err() {
            tracing::trace!("no UI connected, event dropped");
        }
    }
}

impl Presenter for UiPresenter {
    fn display_message(&self, text: &str) {
        self.publish(WsOutgoing::DisplayMessage {
            text: text.to_string(),
        });
    }

    fn show_idle(&self) {
        self.publish(WsOutgoing::ShowIdle);
    }

    fn notify_listening(&self) {
        self.publish(WsOutgoing::Listening);
    }
}

/// Build WebSocket router
pub fn router(state: Arc<UiState>) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}

async fn ws_upgrade(State(state): State<Arc<UiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<UiState>) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let connected = WsOutgoing::Connected {
        connection_id: connection_id.clone(),
        assistant_name: state.assistant_name.clone(),
    };
    if let Ok(msg) = serde_json::to_string(&connected) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            return;
        }
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connected");

    // Replies for this connection only
    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(32);
    let mut events = state.events.subscribe();

    // Forward direct replies and broadcast events to the socket
    let mut send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                reply = rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "UI client lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            if let Ok(text) = serde_json::to_string(&outgoing) {
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let recv_state = Arc::clone(&state);
    let recv_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = handle_message(&text, &recv_state, &tx).await {
                        let error = WsOutgoing::Error {
                            code: "bad_request".to_string(),
                            message: e.to_string(),
                        };
                        let _ = tx.send(error).await;
                    }
                }
                Message::Close(_) => {
                    tracing::info!(connection_id = %recv_id, "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(connection_id = %connection_id, "WebSocket disconnected");
}

/// Handle a single incoming message
async fn handle_message(
    text: &str,
    state: &UiState,
    tx: &mpsc::Sender<WsOutgoing>,
) -> crate::Result<()> {
    let incoming: WsIncoming = serde_json::from_str(text)
        .map_err(|e| crate::Error::InvalidCommand(format!("invalid message: {e}")))?;

    match incoming {
        WsIncoming::Ping => {
            tx.send(WsOutgoing::Pong)
                .await
                .map_err(|_| crate::Error::Config("channel closed".to_string()))?;
        }
        WsIncoming::FrontendReady => {
            if !state.gate.signal_ready() {
                tracing::debug!("frontend already ready");
            }
        }
        WsIncoming::Mic => forward(state, ListenerRequest::Trigger)?,
        WsIncoming::Command { text } => {
            if text.trim().is_empty() {
                return Err(crate::Error::InvalidCommand("empty command".to_string()));
            }
            forward(state, ListenerRequest::Text(text))?;
        }
    }

    Ok(())
}

fn forward(state: &UiState, request: ListenerRequest) -> crate::Result<()> {
    tracing::debug!(request = ?request, "forwarding to listener");
    state
        .requests
        .send(request)
        .map_err(|_| crate::Error::InvalidCommand("assistant is not running".to_string()))
}
