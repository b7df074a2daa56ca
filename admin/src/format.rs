//! Text views of the admin panel.

use common::events::{Button, OutboundCommand, UserId};
use db::models::{
    activation::{ActivationRequest, Statistics},
    purchase::PurchaseRequest,
};

use crate::command::AdminCommand;

pub const PAGE_SIZE: usize = 10;
const PURCHASE_PREVIEW: usize = 20;
const DETAIL_PREVIEW: usize = 10;
const PICKER_LIMIT: usize = 50;
const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

fn button(label: impl Into<String>, command: AdminCommand) -> Button {
    Button::new(label, command.action_id())
}

fn username(value: &Option<String>) -> String {
    value
        .as_ref()
        .map(|u| format!("@{u}"))
        .unwrap_or_else(|| "не указан".to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value { "✅ Да" } else { "❌ Нет" }
}

pub fn menu(user_id: UserId) -> OutboundCommand {
    let rows = [
        ("🔍 Поиск заявки", AdminCommand::Search),
        ("📊 Статистика", AdminCommand::Stats),
        ("🛒 Покупки", AdminCommand::Purchases),
        ("⚙️ Активации", AdminCommand::Activations),
        ("📋 Активации (детально)", AdminCommand::ActivationsDetail),
        ("📄 Экспорт в CSV", AdminCommand::Export),
        ("✅ Отметить как обработанную", AdminCommand::MarkProcessedList),
        ("✉️ Привязать Email/Пароль", AdminCommand::CredentialsList),
        ("🚪 Выход из админ-панели", AdminCommand::Exit),
    ];
    OutboundCommand::text_with_buttons(
        user_id,
        "🔐 Админ-панель\n\nВыберите действие:",
        rows.into_iter()
            .map(|(label, command)| vec![button(label, command)])
            .collect(),
    )
}

pub fn stats(user_id: UserId, stats: &Statistics) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        format!(
            "📊 Статистика\n\n\
             🛒 Всего покупок: {}\n\
             ⚙️ Всего активаций: {}\n\n\
             ⏳ Ожидают оплаты: {}\n\
             💳 Оплата подтверждена: {}\n\
             ✅ Завершено: {}",
            stats.total_purchases,
            stats.total_activations,
            stats.pending_activations,
            stats.payment_confirmed,
            stats.completed_activations
        ),
    )
}

pub fn purchases(user_id: UserId, purchases: &[PurchaseRequest]) -> OutboundCommand {
    if purchases.is_empty() {
        return OutboundCommand::text(user_id, "📭 Покупок пока нет.");
    }

    let mut text = String::from("🛒 Все покупки:\n\n");
    for purchase in purchases.iter().take(PURCHASE_PREVIEW) {
        text.push_str(&format!(
            "{}\nUser ID: {}\nUsername: {}\nИмя: {}\nТелефон: {}\nДата: {}\n{}\n",
            purchase.request_number(),
            purchase.user_id,
            username(&purchase.username),
            purchase.name,
            purchase.phone,
            purchase.created_at.format(TIMESTAMP),
            "─".repeat(30)
        ));
    }
    if purchases.len() > PURCHASE_PREVIEW {
        text.push_str(&format!(
            "\n... и еще {} записей",
            purchases.len() - PURCHASE_PREVIEW
        ));
    }
    OutboundCommand::text(user_id, text)
}

pub fn categories(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text_with_buttons(
        user_id,
        "⚙️ Выберите категорию активаций:",
        vec![
            vec![button("⏳ Ожидают", AdminCommand::PendingPage(0))],
            vec![button("✅ Обработанные", AdminCommand::ProcessedPage(0))],
            vec![button("🔙 Меню", AdminCommand::Menu)],
        ],
    )
}

pub fn activations_detail(user_id: UserId, activations: &[ActivationRequest]) -> OutboundCommand {
    if activations.is_empty() {
        return OutboundCommand::text(user_id, "📭 Активаций пока нет.");
    }

    let mut text = String::from("📋 Детальная информация по активациям:\n\n");
    for activation in activations.iter().take(DETAIL_PREVIEW) {
        text.push_str(&summary(activation));
        text.push_str(&format!("{}\n", "═".repeat(35)));
    }
    if activations.len() > DETAIL_PREVIEW {
        text.push_str(&format!(
            "\n... и еще {} записей",
            activations.len() - DETAIL_PREVIEW
        ));
    }
    OutboundCommand::text(user_id, text)
}

fn summary(activation: &ActivationRequest) -> String {
    let mut text = format!(
        "🔹 {}\nUser ID: {}\nUsername: {}\nИмя: {}\nТелефон: {}\nСтатус: {}\n\
         Оплата получена: {}\nSN устройство: {}\nSN коробка: {}\nKIT номер: {}\n\
         Услуга оказана: {}\nДата создания: {}\n",
        activation.request_number(),
        activation.user_id,
        username(&activation.username),
        activation.name,
        activation.phone,
        activation.status.as_str(),
        yes_no(activation.payment_received),
        activation.serial_number.as_deref().unwrap_or("не указан"),
        activation.box_serial_number.as_deref().unwrap_or("не указан"),
        activation.kit_number.as_deref().unwrap_or("не указан"),
        yes_no(activation.service_provided),
        activation.created_at.format(TIMESTAMP),
    );
    text.push_str(&subscription_lines(activation));
    text
}

fn subscription_lines(activation: &ActivationRequest) -> String {
    match (activation.service_provided_at, activation.subscription_end()) {
        (Some(start), Some(end)) => format!(
            "Дата начала активации: {}\nДата окончания подписки: {}\n",
            start.format(TIMESTAMP),
            end.format(TIMESTAMP)
        ),
        _ => String::new(),
    }
}

/// One request with the actions that apply to it.
pub fn activation_view(
    user_id: UserId,
    activation: &ActivationRequest,
    back_to: AdminCommand,
) -> OutboundCommand {
    let mut text = format!(
        "📋 Детальная информация по заявке {}\n\n\
         🔹 ID заявки: {}\nUser ID: {}\nUsername: {}\nИмя: {}\nТелефон: {}\n\
         Дата создания: {}\nСтатус: {}\nОплата получена: {}\nУслуга оказана: {}\n",
        activation.request_number(),
        activation.id,
        activation.user_id,
        username(&activation.username),
        activation.name,
        activation.phone,
        activation.created_at.format(TIMESTAMP),
        activation.status.as_str(),
        yes_no(activation.payment_received),
        yes_no(activation.service_provided),
    );
    text.push_str(&subscription_lines(activation));
    text.push_str(&format!(
        "\n📦 Данные устройства:\nSN устройство: {}\nSN коробка: {}\n",
        activation.serial_number.as_deref().unwrap_or("не указан"),
        activation.box_serial_number.as_deref().unwrap_or("не указан"),
    ));
    if let Some(kit) = &activation.kit_number {
        text.push_str(&format!("KIT номер: {kit}\n"));
    }
    if let Some(email) = &activation.email {
        text.push_str(&format!("\n📧 Email: {email}\n"));
    }
    if let Some(password) = &activation.password {
        text.push_str(&format!("🔑 Пароль: {password}\n"));
    }

    let toggle_label = if activation.service_provided {
        "❌ Снять отметку об обработке"
    } else {
        "✅ Отметить как обработанную"
    };
    let id = activation.id;
    OutboundCommand::text_with_buttons(
        user_id,
        text,
        vec![
            vec![button("✏️ Редактировать Email/Пароль", AdminCommand::EditCredentials(id))],
            vec![button(toggle_label, AdminCommand::ToggleStatus(id))],
            vec![button("📄 Экспорт заявки", AdminCommand::ExportActivation(id))],
            vec![button("🗑️ Удалить заявку", AdminCommand::DeleteConfirm(id))],
            vec![button("🔙 Назад", back_to)],
        ],
    )
}

pub fn purchase_view(user_id: UserId, purchase: &PurchaseRequest) -> OutboundCommand {
    OutboundCommand::text_with_buttons(
        user_id,
        format!(
            "📋 Детальная информация по заявке {}\n\n\
             🔹 ID заявки: {}\nUser ID: {}\nUsername: {}\nИмя: {}\nТелефон: {}\nДата создания: {}\n",
            purchase.request_number(),
            purchase.id,
            purchase.user_id,
            username(&purchase.username),
            purchase.name,
            purchase.phone,
            purchase.created_at.format(TIMESTAMP),
        ),
        vec![
            vec![button("🗑️ Удалить заявку", AdminCommand::DeletePurchase(purchase.id))],
            vec![button("🔙 Назад", AdminCommand::SearchBack)],
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Pending,
    Processed,
}

impl Category {
    fn page(&self, page: usize) -> AdminCommand {
        match self {
            Category::Pending => AdminCommand::PendingPage(page),
            Category::Processed => AdminCommand::ProcessedPage(page),
        }
    }
}

/// One page of a category listing. Pages past the end show the last page.
pub fn page(
    user_id: UserId,
    category: Category,
    activations: &[ActivationRequest],
    page: usize,
) -> OutboundCommand {
    let (title, empty) = match category {
        Category::Pending => ("⏳ Ожидающие заявки", "📭 Ожидающих заявок пока нет."),
        Category::Processed => ("✅ Обработанные заявки", "📭 Обработанных заявок пока нет."),
    };
    if activations.is_empty() {
        return OutboundCommand::text(user_id, empty);
    }

    let total = activations.len();
    let last_page = (total - 1) / PAGE_SIZE;
    let page = page.min(last_page);
    let start = page * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total);

    let mut rows: Vec<Vec<Button>> = activations[start..end]
        .iter()
        .map(|activation| vec![picker_button(activation, AdminCommand::ViewActivation(activation.id))])
        .collect();

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("◀️ Назад", category.page(page - 1)));
    }
    if page < last_page {
        nav.push(button("▶️ Вперед", category.page(page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    rows.push(vec![button("🔙 Назад к категориям", AdminCommand::Activations)]);

    OutboundCommand::text_with_buttons(
        user_id,
        format!(
            "{title} (страница {})\n\nВсего: {total} заявок\nПоказано: {}-{end} из {total}\n\n\
             Выберите заявку для просмотра деталей:",
            page + 1,
            start + 1,
        ),
        rows,
    )
}

fn picker_button(activation: &ActivationRequest, command: AdminCommand) -> Button {
    button(
        format!(
            "{}: {} ({})",
            activation.request_number(),
            activation.name,
            activation.phone
        ),
        command,
    )
}

/// Unserviced requests to mark as processed.
pub fn mark_picker(user_id: UserId, pending: &[ActivationRequest]) -> OutboundCommand {
    if pending.is_empty() {
        return OutboundCommand::text(user_id, "✅ Все заявки уже обработаны.");
    }
    OutboundCommand::text_with_buttons(
        user_id,
        "Выберите заявку для отметки как обработанную:",
        pending
            .iter()
            .take(PICKER_LIMIT)
            .map(|activation| vec![picker_button(activation, AdminCommand::Mark(activation.id))])
            .collect(),
    )
}

pub fn credentials_picker(user_id: UserId, activations: &[ActivationRequest]) -> OutboundCommand {
    if activations.is_empty() {
        return OutboundCommand::text(user_id, "📭 Активаций пока нет.");
    }
    OutboundCommand::text_with_buttons(
        user_id,
        "Выберите заявку для привязки email и пароля:",
        activations
            .iter()
            .take(PICKER_LIMIT)
            .map(|activation| {
                let mut entry = picker_button(activation, AdminCommand::AddCredentials(activation.id));
                if activation.email.is_some() {
                    entry.label.push_str(" ✉️");
                }
                vec![entry]
            })
            .collect(),
    )
}

/// Prompt for the e-mail of a request, showing what is stored (password masked).
pub fn ask_email(user_id: UserId, activation: &ActivationRequest) -> OutboundCommand {
    let current = if activation.email.is_some() || activation.password.is_some() {
        format!(
            "\nТекущий email: {}\nТекущий пароль: {}",
            activation.email.as_deref().unwrap_or("не указан"),
            activation
                .password
                .as_ref()
                .map(|p| "*".repeat(p.chars().count()))
                .unwrap_or_else(|| "не указан".to_string())
        )
    } else {
        String::new()
    };
    OutboundCommand::text(
        user_id,
        format!(
            "📝 Введите email для заявки {} ({}):{current}\n\nИли отправьте /cancel для отмены.",
            activation.request_number(),
            activation.name
        ),
    )
}

pub fn delete_confirm(user_id: UserId, activation: &ActivationRequest) -> OutboundCommand {
    OutboundCommand::text_with_buttons(
        user_id,
        format!(
            "⚠️ Вы уверены, что хотите удалить заявку {}?\n\nЭто действие нельзя отменить!",
            activation.request_number()
        ),
        vec![
            vec![button("✅ Да, удалить", AdminCommand::DeleteActivation(activation.id))],
            vec![button("❌ Отмена", AdminCommand::ViewActivation(activation.id))],
        ],
    )
}

pub fn ask_search(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        "🔍 Введите номер заявки для поиска:\n\n\
         Формат: ST-000001 (для активаций) или BUY-000001 (для покупок)\n\n\
         Или отправьте /cancel для отмены.",
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::models::activation::ActivationStatus;

    use super::*;

    fn activation(id: i64) -> ActivationRequest {
        ActivationRequest {
            id,
            user_id: 1,
            phone: "+79991234567".into(),
            name: "Иван".into(),
            username: None,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            payment_received: false,
            receipt_reference: None,
            serial_number: None,
            serial_photo_reference: None,
            box_serial_number: None,
            box_serial_photo_reference: None,
            kit_number: None,
            status: ActivationStatus::Pending,
            service_provided: false,
            service_provided_at: None,
            last_reminder_day: None,
            email: None,
            password: Some("secret".into()),
        }
    }

    fn buttons(command: &OutboundCommand) -> Vec<Vec<String>> {
        match command {
            OutboundCommand::SendText { buttons, .. } => buttons
                .iter()
                .map(|row| row.iter().map(|b| b.action_id.clone()).collect())
                .collect(),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pagination() {
        let all: Vec<_> = (1..=25).map(activation).collect();

        let first = buttons(&page(9, Category::Pending, &all, 0));
        assert_eq!(first.len(), PAGE_SIZE + 2);
        assert_eq!(first[0], vec!["view_activation_1"]);
        assert_eq!(first[PAGE_SIZE], vec!["admin_activations_pending_page_1"]);

        let middle = buttons(&page(9, Category::Pending, &all, 1));
        assert_eq!(
            middle[PAGE_SIZE],
            vec![
                "admin_activations_pending_page_0",
                "admin_activations_pending_page_2"
            ]
        );

        // past the end clamps to the last page
        let last = buttons(&page(9, Category::Processed, &all, 7));
        assert_eq!(last.len(), 5 + 2);
        assert_eq!(last[0], vec!["view_activation_21"]);
        assert_eq!(last[5], vec!["admin_activations_processed_page_1"]);
    }

    #[test]
    fn single_page_has_no_navigation() {
        let all: Vec<_> = (1..=3).map(activation).collect();
        let rows = buttons(&page(9, Category::Pending, &all, 0));
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec!["admin_activations"]);
    }

    #[test]
    fn email_prompt_masks_password() {
        match ask_email(9, &activation(4)) {
            OutboundCommand::SendText { text, .. } => {
                assert!(text.contains("ST-000004"));
                assert!(text.contains("******"));
                assert!(!text.contains("secret"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn purchase_list_is_truncated() {
        let purchases: Vec<_> = (1..=22)
            .map(|id| PurchaseRequest {
                id,
                user_id: 1,
                phone: "+79991234567".into(),
                name: "Иван".into(),
                username: Some("ivan".into()),
                created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            })
            .collect();
        let text = purchases_view(&purchases);
        assert!(text.contains("BUY-000020"));
        assert!(!text.contains("BUY-000021"));
        assert!(text.contains("и еще 2 записей"));
        assert!(text.contains("@ivan"));
    }

    fn purchases_view(list: &[PurchaseRequest]) -> String {
        match purchases(1, list) {
            OutboundCommand::SendText { text, .. } => text,
            other => panic!("unexpected command {other:?}"),
        }
    }
}
