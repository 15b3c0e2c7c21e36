use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use chatterbox_core::AppState;
use chatterbox_utils::{
    formatting::normalize_user_message,
    protocol::{ClientEvent, RealtimeOperation, ServerEvent},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tracing::{debug, error, info, warn};

use crate::RouteMeta;
use crate::conversation::{reset_transcript, run_exchange};

pub const META: RouteMeta = RouteMeta {
    method: "GET",
    path: "/ws",
    desc: "Real-time channel (send_message, reset_conversation).",
};

const EXCHANGE_FAILED: &str = "Failed to process your message.";
const RESET_FAILED: &str = "Failed to reset the conversation.";
const INVALID_EVENT: &str = "Unrecognized event.";

pub async fn channel(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut broadcasts = state.subscribe();
    // Events addressed to this connection only (errors).
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<ServerEvent>();
    info!("real-time client connected");

    let writer = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                received = next_broadcast(&mut broadcasts) => match received {
                    Some(event) => event,
                    None => break,
                },
                direct = direct_rx.recv() => match direct {
                    Some(event) => event,
                    None => break,
                },
            };

            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(source) => {
                    error!(?source, "failed to encode real-time event");
                    continue;
                }
            };

            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(reply) = handle_frame(&state, &text).await {
                    let _ = direct_tx.send(reply);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(source) => {
                debug!(?source, "real-time socket error");
                break;
            }
        }
    }

    writer.abort();
    info!("real-time client disconnected");
}

/// Next event to forward from the shared feed. A lagging connection gets an
/// `events_missed` notice in place of what it dropped; `None` once the feed ends.
async fn next_broadcast(broadcasts: &mut broadcast::Receiver<ServerEvent>) -> Option<ServerEvent> {
    match broadcasts.recv().await {
        Ok(event) => Some(event),
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "real-time client lagged; events dropped");
            Some(ServerEvent::EventsMissed { skipped })
        }
        Err(RecvError::Closed) => None,
    }
}

/// Apply one client frame. Returns an event for the sender alone when the
/// frame could not be honoured; successes are broadcast by the operations.
async fn handle_frame(state: &AppState, text: &str) -> Option<ServerEvent> {
    let event = match decode_client_event(text) {
        Ok(event) => event,
        Err(source) => {
            debug!(?source, "rejected real-time frame");
            return Some(error_event(INVALID_EVENT, None));
        }
    };

    match event {
        ClientEvent::SendMessage { message } => {
            let Some(text) = normalize_user_message(&message) else {
                debug!("ignored blank real-time message");
                return None;
            };

            if let Err(source) = run_exchange(state, text).await {
                error!(?source, "real-time exchange failed");
                return Some(error_event(
                    EXCHANGE_FAILED,
                    Some(RealtimeOperation::SendMessage),
                ));
            }
        }
        ClientEvent::ResetConversation => {
            if let Err(source) = reset_transcript(state).await {
                error!(?source, "real-time reset failed");
                return Some(error_event(
                    RESET_FAILED,
                    Some(RealtimeOperation::ResetConversation),
                ));
            }
        }
    }

    None
}

fn decode_client_event(text: &str) -> serde_json::Result<ClientEvent> {
    serde_json::from_str(text)
}

fn error_event(message: &str, operation: Option<RealtimeOperation>) -> ServerEvent {
    ServerEvent::Error {
        message: message.to_owned(),
        operation,
    }
}
