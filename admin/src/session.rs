use common::events::UserId;
use dashmap::DashMap;

use crate::command::AdminCommand;

/// Free-text input an admin session is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Password,
    Search,
    Email { activation_id: i64 },
    CredentialPassword { activation_id: i64, email: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub authenticated: bool,
    pub pending: Option<Pending>,
    /// Where the back button of a detail view leads.
    pub back_to: AdminCommand,
}

impl Default for AdminSession {
    fn default() -> Self {
        Self {
            authenticated: false,
            pending: None,
            back_to: AdminCommand::Activations,
        }
    }
}

#[derive(Debug, Default)]
pub struct AdminSessions {
    sessions: DashMap<UserId, AdminSession>,
}

impl AdminSessions {
    pub fn get(&self, user_id: UserId) -> AdminSession {
        self.sessions
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn update(&self, user_id: UserId, f: impl FnOnce(&mut AdminSession)) {
        let mut entry = self.sessions.entry(user_id).or_default();
        f(entry.value_mut());
    }

    pub fn is_authenticated(&self, user_id: UserId) -> bool {
        self.sessions
            .get(&user_id)
            .is_some_and(|entry| entry.authenticated)
    }

    pub fn has_pending(&self, user_id: UserId) -> bool {
        self.sessions
            .get(&user_id)
            .is_some_and(|entry| entry.pending.is_some())
    }

    pub fn set_pending(&self, user_id: UserId, pending: Option<Pending>) {
        self.update(user_id, |session| session.pending = pending);
    }

    pub fn logout(&self, user_id: UserId) {
        self.sessions.remove(&user_id);
    }
}
