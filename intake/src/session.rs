use common::events::UserId;
use dashmap::DashMap;

use crate::workflow::{IntakeState, Track};

/// In-flight progress of one user. Nothing here is durable: whatever a step
/// has committed lives in the request store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub track: Track,
    pub state: IntakeState,
    /// Normalized phone, held until the name step creates the request row.
    pub phone: Option<String>,
    /// Row created at the name step of the activation track.
    pub activation_id: Option<i64>,
}

impl Session {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            state: IntakeState::AwaitingPhone,
            phone: None,
            activation_id: None,
        }
    }
}

/// Sessions keyed by user id. Created when a track starts, removed on
/// completion, cancel and reset.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<UserId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `track` from its first step, replacing any session in progress.
    pub fn start(&self, user_id: UserId, track: Track) -> Session {
        let session = Session::new(track);
        if let Some(previous) = self.sessions.insert(user_id, session.clone()) {
            log::debug!(
                "User {} left {:?} at {:?} to start {:?}",
                user_id,
                previous.track,
                previous.state,
                track
            );
        }
        session
    }

    pub fn get(&self, user_id: UserId) -> Option<Session> {
        self.sessions.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn put(&self, user_id: UserId, session: Session) {
        self.sessions.insert(user_id, session);
    }

    pub fn clear(&self, user_id: UserId) -> Option<Session> {
        self.sessions.remove(&user_id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
