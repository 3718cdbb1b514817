//! Fire-and-forget publishing of realtime events to a session, a user or a team room.

use std::fmt::Debug;

use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::ws::ServerMessage,
    state::{SessionId, SharedState},
};

/// Serialize `value` into a text frame. Serialization failures are logged and yield `None`.
fn encode<T>(value: &T) -> Option<Message>
where
    T: ?Sized + Serialize + Debug,
{
    match serde_json::to_string(value) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            None
        }
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `false` when the writer side is gone.
pub fn send_message_to_websocket<T>(tx: &mpsc::UnboundedSender<Message>, value: &T) -> bool
where
    T: ?Sized + Serialize + Debug,
{
    match encode(value) {
        Some(message) => tx.send(message).is_ok(),
        None => true,
    }
}

fn fan_out(senders: Vec<mpsc::UnboundedSender<Message>>, message: &ServerMessage) -> usize {
    if senders.is_empty() {
        return 0;
    }
    let Some(frame) = encode(message) else {
        return 0;
    };
    senders
        .into_iter()
        .filter(|tx| tx.send(frame.clone()).is_ok())
        .count()
}

/// Send `message` to one session. Returns whether it was queued.
pub fn emit_to_session(state: &SharedState, session_id: SessionId, message: &ServerMessage) -> bool {
    state
        .sessions()
        .sender(session_id)
        .is_some_and(|tx| send_message_to_websocket(&tx, message))
}

/// Send `message` to every session of `user_id`. Returns the number of sessions reached.
pub fn emit_to_user(state: &SharedState, user_id: Uuid, message: &ServerMessage) -> usize {
    fan_out(state.sessions().user_senders(user_id), message)
}

/// Send `message` to the sessions in `team_id`'s room, skipping `except`.
/// Returns the number of sessions reached.
pub fn emit_to_room(
    state: &SharedState,
    team_id: Uuid,
    except: Option<SessionId>,
    message: &ServerMessage,
) -> usize {
    fan_out(state.sessions().room_senders(team_id, except), message)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        capability::Capabilities,
        config::AppConfig,
        identity::{Identity, StaticIdentityOracle},
        state::AppState,
    };

    fn frame_text(message: Message) -> String {
        match message {
            Message::Text(text) => text.to_string(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn room_broadcast_reaches_members_only() {
        let state = AppState::new(AppConfig::default(), Arc::new(StaticIdentityOracle::default()));
        let team = Uuid::new_v4();
        let identity = Identity {
            user_id: Uuid::new_v4(),
            capabilities: Capabilities::PLAYER,
        };
        let (tx_in, mut rx_in) = mpsc::unbounded_channel();
        let (tx_out, mut rx_out) = mpsc::unbounded_channel();
        let inside = state.sessions().connect(tx_in, identity);
        state.sessions().connect(tx_out, identity);
        state.sessions().join_room(inside, team);

        assert_eq!(emit_to_room(&state, team, None, &ServerMessage::GameOver), 1);
        assert_eq!(
            frame_text(rx_in.try_recv().unwrap()),
            r#"{"event":"game_over"}"#
        );
        assert!(rx_out.try_recv().is_err());

        assert_eq!(
            emit_to_room(&state, team, Some(inside), &ServerMessage::GameOver),
            0
        );
    }

    #[test]
    fn user_broadcast_reaches_every_session_of_the_user() {
        let state = AppState::new(AppConfig::default(), Arc::new(StaticIdentityOracle::default()));
        let user = Uuid::new_v4();
        let identity = Identity {
            user_id: user,
            capabilities: Capabilities::PLAYER,
        };
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let a = state.sessions().connect(tx_a, identity);
        let b = state.sessions().connect(tx_b, identity);
        state.sessions().authenticate(a, user).unwrap();
        state.sessions().authenticate(b, user).unwrap();

        assert_eq!(emit_to_user(&state, user, &ServerMessage::ClearGamesMarks), 2);
    }

    #[test]
    fn closed_session_is_not_counted() {
        let state = AppState::new(AppConfig::default(), Arc::new(StaticIdentityOracle::default()));
        let identity = Identity {
            user_id: Uuid::new_v4(),
            capabilities: Capabilities::PLAYER,
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let session = state.sessions().connect(tx, identity);
        drop(rx);
        assert!(!emit_to_session(&state, session, &ServerMessage::GameOver));
    }
}
