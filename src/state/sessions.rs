//! In-memory table of realtime sessions.
//!
//! Entries are keyed by a per-connection [`SessionId`] and map to the authenticated user and
//! the team room the session joined. The table is rebuilt from reconnects and never persisted.

use std::fmt;

use axum::extract::ws::Message;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::identity::Identity;

/// Transport session identifier, one per WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reasons an `authentication` event is refused by the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The session is not (or no longer) connected.
    #[error("unknown session `{0}`")]
    UnknownSession(SessionId),
    /// The same user already authenticated on this session.
    #[error("user `{user_id}` already authenticated on session `{session_id}`")]
    AlreadyAuthenticated {
        /// Session concerned.
        session_id: SessionId,
        /// User named twice.
        user_id: Uuid,
    },
    /// The event names a user other than the one validated at handshake.
    #[error("session `{session_id}` was opened for another user")]
    IdentityMismatch {
        /// Session concerned.
        session_id: SessionId,
    },
}

struct SessionEntry {
    tx: mpsc::UnboundedSender<Message>,
    handshake: Identity,
    user_id: Option<Uuid>,
    team_room: Option<Uuid>,
}

/// What remains of a session after it disconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartedSession {
    /// User bound by `authentication`, if any.
    pub user_id: Option<Uuid>,
    /// Team room the session had joined.
    pub team_room: Option<Uuid>,
}

/// Registry of connected realtime sessions.
///
/// Lookups hand out owned values; no map guard outlives a call.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly upgraded connection whose token was validated as `handshake`.
    pub fn connect(&self, tx: mpsc::UnboundedSender<Message>, handshake: Identity) -> SessionId {
        let id = SessionId::new();
        self.sessions.insert(
            id,
            SessionEntry {
                tx,
                handshake,
                user_id: None,
                team_room: None,
            },
        );
        id
    }

    /// Bind `user_id` to the session.
    pub fn authenticate(&self, session_id: SessionId, user_id: Uuid) -> Result<(), RegistryError> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or(RegistryError::UnknownSession(session_id))?;
        if entry.user_id == Some(user_id) {
            return Err(RegistryError::AlreadyAuthenticated {
                session_id,
                user_id,
            });
        }
        if entry.handshake.user_id != user_id {
            return Err(RegistryError::IdentityMismatch { session_id });
        }
        entry.user_id = Some(user_id);
        Ok(())
    }

    /// User bound to the session by `authentication`.
    pub fn user_of(&self, session_id: SessionId) -> Option<Uuid> {
        self.sessions.get(&session_id).and_then(|entry| entry.user_id)
    }

    /// Identity validated when the session was opened.
    pub fn handshake_of(&self, session_id: SessionId) -> Option<Identity> {
        self.sessions.get(&session_id).map(|entry| entry.handshake)
    }

    /// Drop the session, returning what the disconnect broadcast needs.
    pub fn remove(&self, session_id: SessionId) -> Option<DepartedSession> {
        self.sessions
            .remove(&session_id)
            .map(|(_, entry)| DepartedSession {
                user_id: entry.user_id,
                team_room: entry.team_room,
            })
    }

    /// Whether at least one authenticated session belongs to `user_id`.
    pub fn is_user_connected(&self, user_id: Uuid) -> bool {
        self.sessions
            .iter()
            .any(|entry| entry.user_id == Some(user_id))
    }

    /// Put the session in `team_id`'s room. Returns `false` when it already was.
    pub fn join_room(&self, session_id: SessionId, team_id: Uuid) -> bool {
        match self.sessions.get_mut(&session_id) {
            Some(mut entry) if entry.team_room != Some(team_id) => {
                entry.team_room = Some(team_id);
                true
            }
            _ => false,
        }
    }

    /// Take the session out of its room, returning the room it left.
    pub fn leave_room(&self, session_id: SessionId) -> Option<Uuid> {
        self.sessions
            .get_mut(&session_id)
            .and_then(|mut entry| entry.team_room.take())
    }

    /// Move every session of `user_id` into `team_id`'s room, or out of any room on `None`.
    /// Returns how many sessions changed room.
    pub fn set_user_room(&self, user_id: Uuid, team_id: Option<Uuid>) -> usize {
        let mut moved = 0;
        for mut entry in self.sessions.iter_mut() {
            if entry.user_id == Some(user_id) && entry.team_room != team_id {
                entry.team_room = team_id;
                moved += 1;
            }
        }
        moved
    }

    /// Room the session currently belongs to.
    pub fn room_of(&self, session_id: SessionId) -> Option<Uuid> {
        self.sessions
            .get(&session_id)
            .and_then(|entry| entry.team_room)
    }

    /// Outbound channel of one session.
    pub fn sender(&self, session_id: SessionId) -> Option<mpsc::UnboundedSender<Message>> {
        self.sessions.get(&session_id).map(|entry| entry.tx.clone())
    }

    /// Outbound channels of every session authenticated as `user_id`.
    pub fn user_senders(&self, user_id: Uuid) -> Vec<mpsc::UnboundedSender<Message>> {
        self.sessions
            .iter()
            .filter(|entry| entry.user_id == Some(user_id))
            .map(|entry| entry.tx.clone())
            .collect()
    }

    /// Outbound channels of the sessions in `team_id`'s room, optionally skipping one.
    pub fn room_senders(
        &self,
        team_id: Uuid,
        except: Option<SessionId>,
    ) -> Vec<mpsc::UnboundedSender<Message>> {
        self.sessions
            .iter()
            .filter(|entry| entry.team_room == Some(team_id) && Some(*entry.key()) != except)
            .map(|entry| entry.tx.clone())
            .collect()
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;

    fn identity(user_id: Uuid) -> Identity {
        Identity {
            user_id,
            capabilities: Capabilities::PLAYER,
        }
    }

    #[test]
    fn authentication_binds_handshake_user_once() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = registry.connect(tx, identity(user));

        assert_eq!(registry.authenticate(session, user), Ok(()));
        assert_eq!(registry.user_of(session), Some(user));
        assert!(registry.is_user_connected(user));
        assert_eq!(
            registry.authenticate(session, user),
            Err(RegistryError::AlreadyAuthenticated {
                session_id: session,
                user_id: user
            })
        );
    }

    #[test]
    fn authentication_for_another_user_is_refused() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = registry.connect(tx, identity(Uuid::new_v4()));

        let err = registry
            .authenticate(session, Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err, RegistryError::IdentityMismatch { session_id: session });
        assert_eq!(registry.user_of(session), None);
    }

    #[test]
    fn room_senders_skip_the_excluded_session() {
        let registry = SessionRegistry::new();
        let team = Uuid::new_v4();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let a = registry.connect(tx_a, identity(Uuid::new_v4()));
        let b = registry.connect(tx_b, identity(Uuid::new_v4()));

        assert!(registry.join_room(a, team));
        assert!(!registry.join_room(a, team));
        registry.join_room(b, team);

        assert_eq!(registry.room_senders(team, None).len(), 2);
        assert_eq!(registry.room_senders(team, Some(a)).len(), 1);

        assert_eq!(registry.leave_room(b), Some(team));
        assert_eq!(registry.room_senders(team, None).len(), 1);
    }

    #[test]
    fn user_room_follows_every_session_of_the_user() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let team = Uuid::new_v4();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let (tx_c, _rx_c) = mpsc::unbounded_channel();
        let a = registry.connect(tx_a, identity(user));
        let b = registry.connect(tx_b, identity(user));
        let other = registry.connect(tx_c, identity(Uuid::new_v4()));
        registry.authenticate(a, user).unwrap();
        registry.authenticate(b, user).unwrap();
        registry.join_room(a, team);
        registry.join_room(other, team);

        assert_eq!(registry.set_user_room(user, None), 1);
        assert_eq!(registry.room_of(a), None);
        assert_eq!(registry.room_of(other), Some(team));

        assert_eq!(registry.set_user_room(user, Some(team)), 2);
        assert_eq!(registry.room_of(b), Some(team));
        assert_eq!(registry.room_senders(team, None).len(), 3);
    }

    #[test]
    fn remove_reports_user_and_room() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let team = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = registry.connect(tx, identity(user));
        registry.authenticate(session, user).unwrap();
        registry.join_room(session, team);

        let departed = registry.remove(session).unwrap();
        assert_eq!(departed.user_id, Some(user));
        assert_eq!(departed.team_room, Some(team));
        assert!(!registry.is_user_connected(user));
        assert!(registry.remove(session).is_none());
    }
}
