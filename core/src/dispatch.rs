use std::sync::Arc;

use admin::AdminService;
use common::events::{InboundEvent, OutboundCommand, UserId};
use dashmap::DashMap;
use intake::IntakeService;
use tokio::sync::Mutex;

/// Routes each inbound event to the admin panel or the customer intake.
///
/// Events of one user are handled one at a time, whichever worker they
/// arrive on. Different users never wait for each other.
pub struct Dispatcher {
    admin: AdminService,
    intake: IntakeService,
    turns: DashMap<UserId, Arc<Mutex<()>>>,
}

impl Dispatcher {
    pub fn new(admin: AdminService, intake: IntakeService) -> Self {
        Self {
            admin,
            intake,
            turns: DashMap::new(),
        }
    }

    pub async fn dispatch(&self, event: &InboundEvent) -> Vec<OutboundCommand> {
        let user_id = event.user_id();
        // clone the lock out so the map shard is not held across the await
        let turn = self.turns.entry(user_id).or_default().clone();
        let _guard = turn.lock().await;
        self.route(user_id, event).await
    }

    async fn route(&self, user_id: UserId, event: &InboundEvent) -> Vec<OutboundCommand> {
        // /start wins over every pending input, admin or customer
        if matches!(event, InboundEvent::SessionReset { .. }) || event.command() == Some("start")
        {
            self.admin.reset(user_id);
            return self.intake.reset(user_id);
        }

        if self.admin.claims(event) {
            return self.admin.handle(event).await;
        }
        self.intake.handle(event).await
    }
}

#[cfg(test)]
mod tests {
    use common::env_config::{AdminConfig, PricingConfig, PromptConfig};
    use sqlx::SqlitePool;

    use super::*;

    const ADMIN: i64 = 1;
    const CUSTOMER: i64 = 2;

    async fn dispatcher() -> Dispatcher {
        dispatcher_with_pool().await.0
    }

    async fn dispatcher_with_pool() -> (Dispatcher, Arc<SqlitePool>) {
        let pool = db::setup_in_memory().await.unwrap();
        let dispatcher = Dispatcher::new(
            AdminService::new(
                pool.clone(),
                &AdminConfig {
                    password: "pw".into(),
                    ids: vec![ADMIN],
                },
            ),
            IntakeService::new(
                pool.clone(),
                PricingConfig {
                    activation_price: 0,
                    activation_price_ton: None,
                    payment_phone: String::new(),
                },
                PromptConfig::default(),
            ),
        );
        (dispatcher, pool)
    }

    fn text(user_id: i64, t: &str) -> InboundEvent {
        InboundEvent::Text {
            user_id,
            username: None,
            text: t.into(),
        }
    }

    fn first_text(commands: &[OutboundCommand]) -> &str {
        match &commands[0] {
            OutboundCommand::SendText { text, .. } => text,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn admin_input_takes_precedence() {
        let dispatcher = dispatcher().await;
        dispatcher
            .dispatch(&InboundEvent::Button {
                user_id: ADMIN,
                action_id: "buy".into(),
            })
            .await;

        // password prompt now owns the next text, not the phone step
        dispatcher.dispatch(&text(ADMIN, "/admin")).await;
        let replies = dispatcher.dispatch(&text(ADMIN, "pw")).await;
        assert!(first_text(&replies).contains("Админ-панель"));

        let replies = dispatcher.dispatch(&text(ADMIN, "89991234567")).await;
        assert_eq!(first_text(&replies), "Теперь введите ваше имя:");
    }

    #[tokio::test]
    async fn same_user_events_run_one_at_a_time() {
        let (dispatcher, pool) = dispatcher_with_pool().await;
        dispatcher
            .dispatch(&InboundEvent::Button {
                user_id: CUSTOMER,
                action_id: "buy".into(),
            })
            .await;
        dispatcher.dispatch(&text(CUSTOMER, "89991234567")).await;

        let ivan = text(CUSTOMER, "Иван");
        let petr = text(CUSTOMER, "Пётр");
        let (first, second) = tokio::join!(
            dispatcher.dispatch(&ivan),
            dispatcher.dispatch(&petr),
        );

        // the second name lands after the session is done and gets the menu
        let replies = [first_text(&first), first_text(&second)];
        assert_eq!(
            replies.iter().filter(|t| t.contains("BUY-000001")).count(),
            1
        );
        assert!(replies.iter().all(|t| !t.contains("BUY-000002")));
        assert!(replies.iter().any(|t| t.starts_with("Добро пожаловать!")));

        let purchases = db::purchase::get_all_purchases(pool.as_ref())
            .await
            .unwrap();
        assert_eq!(purchases.len(), 1);
    }

    #[tokio::test]
    async fn customers_cannot_open_the_panel() {
        let dispatcher = dispatcher().await;
        let replies = dispatcher.dispatch(&text(CUSTOMER, "/admin")).await;
        assert!(replies.is_empty());

        let replies = dispatcher
            .dispatch(&InboundEvent::Button {
                user_id: CUSTOMER,
                action_id: "admin_stats".into(),
            })
            .await;
        assert_eq!(first_text(&replies), "❌ У вас нет доступа.");
    }

    #[tokio::test]
    async fn start_clears_pending_admin_input() {
        let dispatcher = dispatcher().await;
        dispatcher.dispatch(&text(ADMIN, "/admin")).await;

        let replies = dispatcher.dispatch(&text(ADMIN, "/start")).await;
        assert!(first_text(&replies).starts_with("Добро пожаловать!"));

        // "pw" is no longer read as a password
        let replies = dispatcher.dispatch(&text(ADMIN, "pw")).await;
        assert!(first_text(&replies).starts_with("Добро пожаловать!"));
    }
}
