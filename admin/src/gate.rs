use common::{env_config::AdminConfig, events::UserId, misc::constant_time_eq};

/// Two checks guard the panel: the user id must be allow-listed, and the
/// session must have presented the shared password.
#[derive(Debug, Clone)]
pub struct AdminGate {
    ids: Vec<UserId>,
    password: String,
}

impl AdminGate {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            ids: config.ids.clone(),
            password: config.password.clone(),
        }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.ids.contains(&user_id)
    }

    pub fn check_password(&self, attempt: &str) -> bool {
        constant_time_eq(attempt.trim().as_bytes(), self.password.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_and_password() {
        let gate = AdminGate::new(&AdminConfig {
            password: "hunter2".into(),
            ids: vec![1, 2],
        });
        assert!(gate.is_admin(1));
        assert!(!gate.is_admin(3));
        assert!(gate.check_password("hunter2"));
        assert!(gate.check_password(" hunter2\n"));
        assert!(!gate.check_password("hunter"));
        assert!(!gate.check_password("Hunter2"));
    }
}
