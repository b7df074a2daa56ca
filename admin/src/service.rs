use std::sync::Arc;

use chrono::Utc;
use common::{
    env_config::AdminConfig,
    error::Res,
    events::{InboundEvent, OutboundCommand, UserId},
    misc::{RequestKind, format_request_number, parse_request_number},
};
use db::dtos::activation::CredentialsUpdate;
use sqlx::SqlitePool;

use crate::{
    command::AdminCommand,
    export,
    format::{self, Category},
    gate::AdminGate,
    session::{AdminSessions, Pending},
};

/// Staff side of the bot. Runs before the customer intake: whatever it
/// [claims](AdminService::claims) never reaches the intake workflow.
pub struct AdminService {
    pool: Arc<SqlitePool>,
    gate: AdminGate,
    sessions: AdminSessions,
}

impl AdminService {
    pub fn new(pool: Arc<SqlitePool>, config: &AdminConfig) -> Self {
        Self {
            pool,
            gate: AdminGate::new(config),
            sessions: AdminSessions::default(),
        }
    }

    /// Whether `event` belongs to the admin panel.
    ///
    /// `/admin` is only claimed for allow-listed users, so for everyone else
    /// the panel does not exist. Admin buttons are always claimed so that
    /// outsiders get an explicit refusal. Free text is claimed while an admin
    /// session waits for input.
    pub fn claims(&self, event: &InboundEvent) -> bool {
        let user_id = event.user_id();
        match event {
            InboundEvent::Button { action_id, .. } => AdminCommand::parse(action_id).is_some(),
            InboundEvent::Text { .. } => match event.command() {
                Some("admin") => self.gate.is_admin(user_id),
                Some("cancel") => self.gate.is_admin(user_id) && self.sessions.has_pending(user_id),
                Some(_) => false,
                None => self.gate.is_admin(user_id) && self.sessions.has_pending(user_id),
            },
            _ => false,
        }
    }

    /// Forgets any input the admin session was waiting for. The login stays.
    pub fn reset(&self, user_id: UserId) {
        self.sessions.set_pending(user_id, None);
    }

    pub async fn handle(&self, event: &InboundEvent) -> Vec<OutboundCommand> {
        let user_id = event.user_id();
        match self.dispatch(event).await {
            Ok(commands) => commands,
            Err(error) => {
                log::error!("Admin action failed for user {}: {}", user_id, error);
                vec![OutboundCommand::text(
                    user_id,
                    "❌ Ошибка при обращении к базе данных. Попробуйте еще раз.",
                )]
            }
        }
    }

    async fn dispatch(&self, event: &InboundEvent) -> Res<Vec<OutboundCommand>> {
        let user_id = event.user_id();
        match event {
            InboundEvent::Button { action_id, .. } => {
                let Some(command) = AdminCommand::parse(action_id) else {
                    return Ok(Vec::new());
                };
                if !self.gate.is_admin(user_id) {
                    log::warn!("User {} pressed admin button {}", user_id, action_id);
                    return Ok(vec![OutboundCommand::text(user_id, "❌ У вас нет доступа.")]);
                }
                if !self.sessions.is_authenticated(user_id) {
                    return Ok(vec![OutboundCommand::text(
                        user_id,
                        "🔐 Сначала войдите в админ-панель командой /admin.",
                    )]);
                }
                self.execute(user_id, command).await
            }
            InboundEvent::Text { text, .. } => match event.command() {
                Some("admin") => {
                    self.sessions.set_pending(user_id, Some(Pending::Password));
                    Ok(vec![OutboundCommand::text(
                        user_id,
                        "🔐 Админ-панель\n\nВведите пароль для доступа:",
                    )])
                }
                Some("cancel") => {
                    self.reset(user_id);
                    Ok(vec![OutboundCommand::text(user_id, "Операция отменена.")])
                }
                _ => self.input(user_id, text).await,
            },
            _ => Ok(Vec::new()),
        }
    }

    /// Free text answering whatever the session is waiting for.
    async fn input(&self, user_id: UserId, text: &str) -> Res<Vec<OutboundCommand>> {
        let session = self.sessions.get(user_id);
        let Some(pending) = session.pending else {
            return Ok(Vec::new());
        };
        let value = text.trim();

        match pending {
            Pending::Password => {
                if !self.gate.check_password(value) {
                    log::warn!("Wrong admin password from user {}", user_id);
                    return Ok(vec![OutboundCommand::text(
                        user_id,
                        "❌ Неверный пароль. Попробуйте еще раз:",
                    )]);
                }
                self.sessions.update(user_id, |session| {
                    session.authenticated = true;
                    session.pending = None;
                });
                log::info!("User {} logged into the admin panel", user_id);
                Ok(vec![format::menu(user_id)])
            }
            Pending::Search => self.search(user_id, value).await,
            Pending::Email { activation_id } => {
                if value.is_empty() {
                    return Ok(vec![OutboundCommand::text(
                        user_id,
                        "Пожалуйста, введите email:",
                    )]);
                }
                self.sessions.set_pending(
                    user_id,
                    Some(Pending::CredentialPassword {
                        activation_id,
                        email: value.to_string(),
                    }),
                );
                Ok(vec![OutboundCommand::text(
                    user_id,
                    format!(
                        "📝 Теперь введите пароль для заявки {}:",
                        format_request_number(RequestKind::Activation, activation_id)
                    ),
                )])
            }
            Pending::CredentialPassword {
                activation_id,
                email,
            } => {
                if value.is_empty() {
                    return Ok(vec![OutboundCommand::text(
                        user_id,
                        "Пожалуйста, введите пароль:",
                    )]);
                }
                let number = format_request_number(RequestKind::Activation, activation_id);
                // a failed write keeps the typed email so only the password is retried
                let saved = db::activation::update_credentials(
                    self.pool.as_ref(),
                    activation_id,
                    CredentialsUpdate {
                        email,
                        password: value.to_string(),
                    },
                )
                .await?;
                self.sessions.set_pending(user_id, None);
                if !saved {
                    return Ok(vec![OutboundCommand::text(
                        user_id,
                        "❌ Ошибка при сохранении данных: заявка не найдена.",
                    )]);
                }

                log::info!("Credentials attached to {} by user {}", number, user_id);
                let mut replies = vec![OutboundCommand::text(
                    user_id,
                    format!("✅ Email и пароль успешно привязаны к заявке {number}!"),
                )];
                replies.extend(self.view(user_id, activation_id).await?);
                Ok(replies)
            }
        }
    }

    async fn search(&self, user_id: UserId, query: &str) -> Res<Vec<OutboundCommand>> {
        let pool = self.pool.as_ref();
        let found = match parse_request_number(query) {
            Some((RequestKind::Activation, id)) => db::activation::get_activation_by_id(pool, id)
                .await?
                .map(|activation| {
                    self.sessions.update(user_id, |session| {
                        session.pending = None;
                        session.back_to = AdminCommand::SearchBack;
                    });
                    format::activation_view(user_id, &activation, AdminCommand::SearchBack)
                }),
            Some((RequestKind::Purchase, id)) => db::purchase::get_purchase_by_id(pool, id)
                .await?
                .map(|purchase| {
                    self.sessions.set_pending(user_id, None);
                    format::purchase_view(user_id, &purchase)
                }),
            None => None,
        };

        Ok(vec![found.unwrap_or_else(|| {
            OutboundCommand::text(
                user_id,
                format!(
                    "❌ Заявка с номером {} не найдена.\n\n\
                     Попробуйте еще раз или отправьте /cancel для отмены.",
                    query.to_uppercase()
                ),
            )
        })])
    }

    async fn view(&self, user_id: UserId, activation_id: i64) -> Res<Vec<OutboundCommand>> {
        let back_to = self.sessions.get(user_id).back_to;
        Ok(
            match db::activation::get_activation_by_id(self.pool.as_ref(), activation_id).await? {
                Some(activation) => vec![format::activation_view(user_id, &activation, back_to)],
                None => vec![not_found(user_id)],
            },
        )
    }

    async fn execute(&self, user_id: UserId, command: AdminCommand) -> Res<Vec<OutboundCommand>> {
        let pool = self.pool.as_ref();
        log::debug!("Admin {} runs {:?}", user_id, command);

        let replies = match command {
            AdminCommand::Menu => vec![format::menu(user_id)],
            AdminCommand::Stats => {
                let stats = db::activation::get_statistics(pool).await?;
                vec![format::stats(user_id, &stats)]
            }
            AdminCommand::Purchases => {
                let purchases = db::purchase::get_all_purchases(pool).await?;
                vec![format::purchases(user_id, &purchases)]
            }
            AdminCommand::Activations => vec![format::categories(user_id)],
            AdminCommand::ActivationsDetail => {
                let activations = db::activation::get_all_activations(pool).await?;
                vec![format::activations_detail(user_id, &activations)]
            }
            AdminCommand::Export => {
                let activations = db::activation::get_all_activations(pool).await?;
                log::info!("Admin {} exported {} activations", user_id, activations.len());
                vec![export::export_all(user_id, &activations, Utc::now().naive_utc())]
            }
            AdminCommand::ExportActivation(id) => {
                match db::activation::get_activation_by_id(pool, id).await? {
                    Some(activation) => {
                        vec![export::export_one(user_id, &activation, Utc::now().naive_utc())]
                    }
                    None => vec![not_found(user_id)],
                }
            }
            AdminCommand::MarkProcessedList => {
                let pending = db::activation::get_pending_activations(pool).await?;
                vec![format::mark_picker(user_id, &pending)]
            }
            AdminCommand::Mark(id) => {
                let number = format_request_number(RequestKind::Activation, id);
                if db::activation::mark_service_provided(pool, id, Utc::now().naive_utc()).await? {
                    log::info!("Admin {} marked {} as serviced", user_id, number);
                    vec![OutboundCommand::text(
                        user_id,
                        format!("✅ Заявка {number} отмечена как обработанная."),
                    )]
                } else {
                    vec![OutboundCommand::text(
                        user_id,
                        format!("❌ Ошибка при обработке заявки {number}."),
                    )]
                }
            }
            AdminCommand::CredentialsList => {
                let activations = db::activation::get_all_activations(pool).await?;
                vec![format::credentials_picker(user_id, &activations)]
            }
            AdminCommand::AddCredentials(id) | AdminCommand::EditCredentials(id) => {
                match db::activation::get_activation_by_id(pool, id).await? {
                    Some(activation) => {
                        self.sessions.set_pending(
                            user_id,
                            Some(Pending::Email {
                                activation_id: id,
                            }),
                        );
                        vec![format::ask_email(user_id, &activation)]
                    }
                    None => vec![not_found(user_id)],
                }
            }
            AdminCommand::PendingPage(page) => {
                let activations = db::activation::get_pending_activations(pool).await?;
                self.sessions
                    .update(user_id, |session| session.back_to = command);
                vec![format::page(user_id, Category::Pending, &activations, page)]
            }
            AdminCommand::ProcessedPage(page) => {
                let activations = db::activation::get_processed_activations(pool).await?;
                self.sessions
                    .update(user_id, |session| session.back_to = command);
                vec![format::page(user_id, Category::Processed, &activations, page)]
            }
            AdminCommand::ViewActivation(id) => self.view(user_id, id).await?,
            AdminCommand::ToggleStatus(id) => {
                if !db::activation::toggle_service_provided(pool, id, Utc::now().naive_utc())
                    .await?
                {
                    return Ok(vec![OutboundCommand::text(
                        user_id,
                        "❌ Ошибка при изменении статуса заявки.",
                    )]);
                }
                match db::activation::get_activation_by_id(pool, id).await? {
                    Some(activation) => {
                        let status = if activation.service_provided {
                            "отмечена как обработанная"
                        } else {
                            "отметка снята"
                        };
                        log::info!(
                            "Admin {} toggled {}: {}",
                            user_id,
                            activation.request_number(),
                            status
                        );
                        let back_to = self.sessions.get(user_id).back_to;
                        vec![
                            OutboundCommand::text(
                                user_id,
                                format!("✅ Заявка {} {status}.", activation.request_number()),
                            ),
                            format::activation_view(user_id, &activation, back_to),
                        ]
                    }
                    None => vec![not_found(user_id)],
                }
            }
            AdminCommand::DeleteConfirm(id) => {
                match db::activation::get_activation_by_id(pool, id).await? {
                    Some(activation) => vec![format::delete_confirm(user_id, &activation)],
                    None => vec![not_found(user_id)],
                }
            }
            AdminCommand::DeleteActivation(id) => {
                let number = format_request_number(RequestKind::Activation, id);
                vec![deleted(
                    user_id,
                    &number,
                    db::activation::delete_activation(pool, id).await?,
                )]
            }
            AdminCommand::DeletePurchase(id) => {
                let number = format_request_number(RequestKind::Purchase, id);
                vec![deleted(
                    user_id,
                    &number,
                    db::purchase::delete_purchase(pool, id).await?,
                )]
            }
            AdminCommand::Search | AdminCommand::SearchBack => {
                self.sessions.set_pending(user_id, Some(Pending::Search));
                vec![format::ask_search(user_id)]
            }
            AdminCommand::Exit => {
                self.sessions.logout(user_id);
                log::info!("User {} left the admin panel", user_id);
                vec![intake::messages::welcome_with(
                    user_id,
                    "👋 Вы вышли из админ-панели.",
                )]
            }
        };
        Ok(replies)
    }
}

fn not_found(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(user_id, "❌ Заявка не найдена.")
}

fn deleted(user_id: UserId, number: &str, removed: bool) -> OutboundCommand {
    if removed {
        log::info!("Request {} deleted", number);
        OutboundCommand::text(user_id, format!("✅ Заявка {number} успешно удалена."))
    } else {
        OutboundCommand::text(user_id, format!("❌ Ошибка при удалении заявки {number}."))
    }
}

#[cfg(test)]
mod tests {
    use db::dtos::{activation::ActivationCreateRequest, purchase::PurchaseCreateRequest};

    use super::*;

    const ADMIN: UserId = 100;
    const OUTSIDER: UserId = 200;

    async fn service() -> AdminService {
        let pool = db::setup_in_memory().await.unwrap();
        AdminService::new(
            pool,
            &AdminConfig {
                password: "hunter2".into(),
                ids: vec![ADMIN],
            },
        )
    }

    async fn seed_activation(service: &AdminService) -> i64 {
        db::activation::insert_activation(
            service.pool.as_ref(),
            ActivationCreateRequest {
                user_id: 1,
                phone: "+79991234567".into(),
                name: "Иван".into(),
                username: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn text(user_id: UserId, t: &str) -> InboundEvent {
        InboundEvent::Text {
            user_id,
            username: None,
            text: t.into(),
        }
    }

    fn press(user_id: UserId, command: AdminCommand) -> InboundEvent {
        InboundEvent::Button {
            user_id,
            action_id: command.action_id(),
        }
    }

    fn first_text(commands: &[OutboundCommand]) -> String {
        match &commands[0] {
            OutboundCommand::SendText { text, .. } => text.clone(),
            other => panic!("unexpected command {other:?}"),
        }
    }

    async fn login(service: &AdminService) {
        assert!(service.claims(&text(ADMIN, "/admin")));
        service.handle(&text(ADMIN, "/admin")).await;
        assert!(service.claims(&text(ADMIN, "hunter2")));
        let replies = service.handle(&text(ADMIN, "hunter2")).await;
        assert!(first_text(&replies).contains("Выберите действие"));
    }

    #[tokio::test]
    async fn outsiders_never_see_the_panel() {
        let service = service().await;
        assert!(!service.claims(&text(OUTSIDER, "/admin")));
        assert!(!service.claims(&text(OUTSIDER, "hunter2")));

        let stats = press(OUTSIDER, AdminCommand::Stats);
        assert!(service.claims(&stats));
        assert_eq!(first_text(&service.handle(&stats).await), "❌ У вас нет доступа.");
    }

    #[tokio::test]
    async fn password_is_required() {
        let service = service().await;
        let replies = service.handle(&press(ADMIN, AdminCommand::Stats)).await;
        assert!(first_text(&replies).contains("/admin"));

        service.handle(&text(ADMIN, "/admin")).await;
        let replies = service.handle(&text(ADMIN, "wrong")).await;
        assert!(first_text(&replies).contains("Неверный пароль"));
        assert!(service.claims(&text(ADMIN, "hunter2")));

        service.handle(&text(ADMIN, "hunter2")).await;
        assert!(!service.claims(&text(ADMIN, "hello")));
        let replies = service.handle(&press(ADMIN, AdminCommand::Stats)).await;
        assert!(first_text(&replies).contains("Всего активаций: 0"));
    }

    #[tokio::test]
    async fn mark_and_toggle() {
        let service = service().await;
        let id = seed_activation(&service).await;
        login(&service).await;

        let replies = service.handle(&press(ADMIN, AdminCommand::Mark(id))).await;
        assert!(first_text(&replies).contains("ST-000001 отмечена как обработанная"));
        let stored = db::activation::get_activation_by_id(service.pool.as_ref(), id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.service_provided);
        assert!(stored.service_provided_at.is_some());

        let replies = service
            .handle(&press(ADMIN, AdminCommand::ToggleStatus(id)))
            .await;
        assert!(first_text(&replies).contains("отметка снята"));
        assert_eq!(replies.len(), 2);

        let replies = service.handle(&press(ADMIN, AdminCommand::Mark(999))).await;
        assert!(first_text(&replies).contains("Ошибка"));
    }

    #[tokio::test]
    async fn credentials_flow() {
        let service = service().await;
        let id = seed_activation(&service).await;
        login(&service).await;

        // password step without a selection is impossible: email comes first
        service
            .handle(&press(ADMIN, AdminCommand::AddCredentials(id)))
            .await;
        assert!(service.claims(&text(ADMIN, "user@example.com")));
        let replies = service.handle(&text(ADMIN, "user@example.com")).await;
        assert!(first_text(&replies).contains("введите пароль для заявки ST-000001"));

        let replies = service.handle(&text(ADMIN, "s3cret")).await;
        assert!(first_text(&replies).contains("успешно привязаны"));
        assert!(!service.claims(&text(ADMIN, "anything")));

        let stored = db::activation::get_activation_by_id(service.pool.as_ref(), id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.email.as_deref(), Some("user@example.com"));
        assert_eq!(stored.password.as_deref(), Some("s3cret"));
    }

    #[tokio::test]
    async fn failed_credential_write_keeps_the_email() {
        let service = service().await;
        let id = seed_activation(&service).await;
        login(&service).await;
        service
            .handle(&press(ADMIN, AdminCommand::AddCredentials(id)))
            .await;
        service.handle(&text(ADMIN, "user@example.com")).await;

        service.pool.close().await;
        let replies = service.handle(&text(ADMIN, "s3cret")).await;
        assert!(first_text(&replies).contains("Ошибка при обращении к базе данных"));
        assert_eq!(
            service.sessions.get(ADMIN).pending,
            Some(Pending::CredentialPassword {
                activation_id: id,
                email: "user@example.com".into(),
            })
        );
    }

    #[tokio::test]
    async fn credentials_for_missing_request() {
        let service = service().await;
        login(&service).await;
        let replies = service
            .handle(&press(ADMIN, AdminCommand::EditCredentials(5)))
            .await;
        assert_eq!(first_text(&replies), "❌ Заявка не найдена.");
        assert!(!service.claims(&text(ADMIN, "user@example.com")));
    }

    #[tokio::test]
    async fn search_by_request_number() {
        let service = service().await;
        seed_activation(&service).await;
        db::purchase::insert_purchase(
            service.pool.as_ref(),
            PurchaseCreateRequest {
                user_id: 2,
                phone: "+79990000000".into(),
                name: "Петр".into(),
                username: None,
            },
        )
        .await
        .unwrap();
        login(&service).await;

        service.handle(&press(ADMIN, AdminCommand::Search)).await;
        let replies = service.handle(&text(ADMIN, "st-000009")).await;
        assert!(first_text(&replies).contains("ST-000009 не найдена"));
        assert!(service.claims(&text(ADMIN, "ST-000001")));

        let replies = service.handle(&text(ADMIN, " st-000001 ")).await;
        assert!(first_text(&replies).contains("заявке ST-000001"));
        match &replies[0] {
            OutboundCommand::SendText { buttons, .. } => {
                let back = buttons.last().unwrap()[0].action_id.clone();
                assert_eq!(back, "admin_search_back");
            }
            other => panic!("unexpected command {other:?}"),
        }

        service.handle(&press(ADMIN, AdminCommand::SearchBack)).await;
        let replies = service.handle(&text(ADMIN, "BUY-1")).await;
        assert!(first_text(&replies).contains("BUY-000001"));
    }

    #[tokio::test]
    async fn delete_requests() {
        let service = service().await;
        let id = seed_activation(&service).await;
        login(&service).await;

        let replies = service
            .handle(&press(ADMIN, AdminCommand::DeleteConfirm(id)))
            .await;
        assert!(first_text(&replies).contains("Вы уверены"));

        let replies = service
            .handle(&press(ADMIN, AdminCommand::DeleteActivation(id)))
            .await;
        assert!(first_text(&replies).contains("успешно удалена"));
        let replies = service
            .handle(&press(ADMIN, AdminCommand::DeleteActivation(id)))
            .await;
        assert!(first_text(&replies).contains("Ошибка при удалении"));
    }

    #[tokio::test]
    async fn export_sends_a_document() {
        let service = service().await;
        seed_activation(&service).await;
        login(&service).await;

        let replies = service.handle(&press(ADMIN, AdminCommand::Export)).await;
        match &replies[0] {
            OutboundCommand::SendDocument {
                filename, content, ..
            } => {
                use base64::Engine;
                assert!(filename.starts_with("activations_") && filename.ends_with(".csv"));
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(content)
                    .unwrap();
                let csv = String::from_utf8(bytes).unwrap();
                assert!(csv.contains("ST-000001"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_and_exit() {
        let service = service().await;
        login(&service).await;

        service.handle(&press(ADMIN, AdminCommand::Search)).await;
        assert!(service.claims(&text(ADMIN, "/cancel")));
        service.handle(&text(ADMIN, "/cancel")).await;
        assert!(!service.claims(&text(ADMIN, "ST-000001")));
        assert!(!service.claims(&text(ADMIN, "/cancel")));

        let replies = service.handle(&press(ADMIN, AdminCommand::Exit)).await;
        assert!(first_text(&replies).contains("Вы вышли"));
        let replies = service.handle(&press(ADMIN, AdminCommand::Stats)).await;
        assert!(first_text(&replies).contains("/admin"));
    }
}
