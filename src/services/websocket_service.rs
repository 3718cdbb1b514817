use std::time::SystemTime;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    dto::ws::{ClientMessage, RejectionPayload, ServerMessage},
    error::ServiceError,
    identity::Identity,
    services::{realtime::emit_to_session, session_service},
    state::{SessionId, SharedState},
};

/// Handle the full lifecycle of one realtime session opened by `identity`.
pub async fn handle_socket(state: SharedState, socket: WebSocket, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let session_id = state.sessions().connect(outbound_tx.clone(), identity);
    info!(session = %session_id, user_id = %identity.user_id, "realtime session opened");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(session = %session_id, payload = %text, "received client event");
                handle_text(&state, session_id, &text).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(session = %session_id, error = %err, "websocket error");
                break;
            }
        }
    }

    session_service::disconnect(&state, session_id).await;
    finalize(writer_task, outbound_tx).await;
}

/// Parse, validate and dispatch one text frame. Errors never escape the session.
pub async fn handle_text(state: &SharedState, session_id: SessionId, text: &str) {
    let message = match ClientMessage::from_json_str(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(session = %session_id, error = %err, "rejected client event");
            reject(state, session_id, "input_rejected", "malformed or invalid event");
            return;
        }
    };

    let event = message.name();
    match session_service::handle_event(state, session_id, message, SystemTime::now()).await {
        Ok(()) => {}
        Err(err) if err.is_client_error() => {
            debug!(session = %session_id, event, error = %err, "client event refused");
            reject(state, session_id, err.kind(), &err.to_string());
        }
        Err(err @ ServiceError::Invariant(_)) => {
            error!(session = %session_id, event, error = %err, "integrity violation while handling event");
        }
        Err(err) => {
            warn!(session = %session_id, event, error = %err, "failed to handle client event");
        }
    }
}

fn reject(state: &SharedState, session_id: SessionId, kind: &str, message: &str) {
    emit_to_session(
        state,
        session_id,
        &ServerMessage::Rejected(RejectionPayload {
            kind: kind.into(),
            message: message.into(),
        }),
    );
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
