//! Customer-facing texts and keyboards of the intake flow.

use common::{
    env_config::{PricingConfig, PromptConfig},
    events::{Button, OutboundCommand, UserId},
};

use crate::workflow::{Field, IntakeState, Track};

pub const ACTION_BUY: &str = "buy";
pub const ACTION_ACTIVATE: &str = "activate";
pub const ACTION_CANCEL: &str = "cancel";
pub const ACTION_SKIP_SERIAL_PHOTO: &str = "skip_serial_photo";
pub const ACTION_SKIP_BOX_PHOTO: &str = "skip_box_photo";

const WELCOME: &str = "Добро пожаловать! 👋\n\n\
    Это техподдержка по активации терминалов Starlink. \
    Я помогу вам купить терминал или активировать уже имеющееся устройство.\n\n\
    Выберите нужное действие:";

const SERIAL_INSTRUCTION: &str = "Спасибо за доверие! Для активации от Вас нужен серийный номер \
    (написан на ножке после букв SN) + фото серийного номера \
    (чтобы исключить риск активации чужого устройства), прилагаем пример:";

const BOX_SERIAL_INSTRUCTION: &str =
    "А также серийный номер с коробки терминала (написан после букв SN) + его фото, прилагаем пример:";

const ALL_RECEIVED: &str =
    "✅ Все данные получены!\n\nПожалуйста, ожидайте. ⏳\n\nМы свяжемся с вами в ближайшее время.";

pub fn main_menu() -> Vec<Vec<Button>> {
    vec![
        vec![Button::new("🛒 Купить терминал", ACTION_BUY)],
        vec![Button::new("⚙️ Активировать", ACTION_ACTIVATE)],
    ]
}

pub fn welcome(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text_with_buttons(user_id, WELCOME, main_menu())
}

/// Welcome menu preceded by a leading line, e.g. after leaving the admin panel.
pub fn welcome_with(user_id: UserId, lead: &str) -> OutboundCommand {
    OutboundCommand::text_with_buttons(user_id, format!("{lead}\n\n{WELCOME}"), main_menu())
}

pub fn cancelled(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(user_id, "Операция отменена.")
}

pub fn track_intro(user_id: UserId, track: Track) -> OutboundCommand {
    let purpose = match track {
        Track::Purchase => "покупки",
        Track::Activation => "активации",
    };
    OutboundCommand::text(
        user_id,
        format!(
            "Для {purpose} терминала мне нужна ваша информация.\n\n\
             Пожалуйста, введите ваш номер телефона (формат: 8XXXXXXXXXX или +7XXXXXXXXXX):"
        ),
    )
}

pub fn ask_name(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(user_id, "Теперь введите ваше имя:")
}

pub fn purchase_created(user_id: UserId, request_number: &str) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        format!(
            "✅ Заявка создана!\n\nНомер вашей заявки: {request_number}\n\n\
             Спасибо! Мы с вами свяжемся."
        ),
    )
}

pub fn activation_created(user_id: UserId, request_number: &str) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        format!(
            "✅ Заявка создана!\n\nНомер вашей заявки: {request_number}\n\n\
             Сохраните этот номер для отслеживания статуса."
        ),
    )
}

/// Instruction with the example image when one is configured, plain text otherwise.
fn instruction(user_id: UserId, text: String, image: Option<&String>) -> OutboundCommand {
    match image {
        Some(image) => OutboundCommand::photo(user_id, image.as_str(), text),
        None => OutboundCommand::text(user_id, text),
    }
}

pub fn ask_serial(user_id: UserId, prompts: &PromptConfig) -> Vec<OutboundCommand> {
    let mut text = SERIAL_INSTRUCTION.to_string();
    if let Some(example) = &prompts.serial_number_example {
        text.push_str(&format!("\n\nПример серийного номера: {example}"));
    }
    vec![
        instruction(user_id, text, prompts.serial_example_image.as_ref()),
        OutboundCommand::text(user_id, "Пожалуйста, введите серийный номер устройства (SN):"),
    ]
}

fn photo_step_buttons(skip_action: &str) -> Vec<Vec<Button>> {
    vec![
        vec![Button::new("⏭️ Пропустить фото", skip_action)],
        vec![Button::new("❌ Отменить", ACTION_CANCEL)],
    ]
}

pub fn ask_serial_photo(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text_with_buttons(
        user_id,
        "Теперь отправьте фото серийного номера:",
        photo_step_buttons(ACTION_SKIP_SERIAL_PHOTO),
    )
}

pub fn ask_box_serial(user_id: UserId, prompts: &PromptConfig) -> Vec<OutboundCommand> {
    vec![
        instruction(
            user_id,
            BOX_SERIAL_INSTRUCTION.to_string(),
            prompts.box_serial_example_image.as_ref(),
        ),
        OutboundCommand::text(user_id, "Пожалуйста, введите серийный номер с коробки (SN):"),
    ]
}

pub fn ask_box_serial_photo(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text_with_buttons(
        user_id,
        "Теперь отправьте фото серийного номера с коробки:",
        photo_step_buttons(ACTION_SKIP_BOX_PHOTO),
    )
}

pub fn serial_photo_skipped(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        "⚠️ Внимание!\n\n\
         Вы пропустили отправку фото серийного номера устройства.\n\n\
         Если серийный номер будет указан неверно, вся ответственность за это ложится на вас.\n\n\
         Продолжаем без фото...",
    )
}

pub fn box_photo_skipped(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        "⚠️ Внимание!\n\n\
         Вы пропустили отправку фото серийного номера с коробки.\n\n\
         Если серийные номера будут указаны неверно, вся ответственность за это ложится на вас.",
    )
}

/// Closing message of the activation track, with payment details when a price is set.
pub fn activation_received(user_id: UserId, pricing: &PricingConfig) -> OutboundCommand {
    let mut text = ALL_RECEIVED.to_string();
    if pricing.activation_price > 0 {
        text.push_str(&format!(
            "\n\n💳 Стоимость активации: {} ₽",
            pricing.activation_price
        ));
        if let Some(ton) = &pricing.activation_price_ton {
            text.push_str(&format!(" ({ton} TON)"));
        }
        if !pricing.payment_phone.is_empty() {
            text.push_str(&format!(
                "\nОплата переводом по номеру: {}",
                pricing.payment_phone
            ));
        }
    }
    OutboundCommand::text(user_id, text)
}

pub fn payment_received(user_id: UserId, request_number: &str) -> Vec<OutboundCommand> {
    vec![
        OutboundCommand::text(
            user_id,
            format!("✅ Платеж по заявке {request_number} успешно получен!"),
        ),
        OutboundCommand::text(
            user_id,
            "Пожалуйста, введите KIT номер (указан на коробке с комплектом):",
        ),
    ]
}

pub fn no_pending_payment(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        "Не найдено заявок, ожидающих оплаты. Если вы уже оплатили, мы свяжемся с вами.",
    )
}

pub fn kit_saved(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(user_id, "KIT номер сохранен. Пожалуйста, ожидайте. ⏳")
}

pub fn request_missing(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text_with_buttons(
        user_id,
        "❌ Заявка не найдена. Пожалуйста, начните заново.",
        main_menu(),
    )
}

pub fn storage_failure(user_id: UserId) -> OutboundCommand {
    OutboundCommand::text(
        user_id,
        "❌ Произошла ошибка при сохранении данных. Пожалуйста, попробуйте еще раз.",
    )
}

/// Re-prompt after input that failed validation.
pub fn invalid(user_id: UserId, field: Field) -> OutboundCommand {
    let text = match field {
        Field::Phone => {
            "❌ Неверный формат номера телефона.\n\n\
             Номер должен содержать 11 цифр и начинаться с +7 или 8.\n\
             Пример: +79991234567 или 89991234567\n\n\
             Пожалуйста, введите номер еще раз:"
        }
        Field::Name => {
            "❌ Имя должно содержать только русские буквы (кириллицу) и пробелы.\n\n\
             Пожалуйста, введите ваше имя еще раз:"
        }
        Field::Serial => {
            "❌ Неверный формат серийного номера.\n\n\
             Серийный номер должен содержать только латинские буквы и цифры, или только цифры.\n\n\
             Пожалуйста, введите серийный номер еще раз:"
        }
        Field::BoxSerial => {
            "❌ Неверный формат серийного номера.\n\n\
             Серийный номер должен содержать только латинские буквы и цифры, или только цифры.\n\n\
             Пожалуйста, введите серийный номер с коробки еще раз:"
        }
        Field::SerialPhoto => "Пожалуйста, отправьте фото серийного номера (фото или документ).",
        Field::BoxSerialPhoto => {
            "Пожалуйста, отправьте фото серийного номера с коробки (фото или документ)."
        }
        Field::Kit => "Пожалуйста, введите KIT номер:",
    };
    OutboundCommand::text(user_id, text)
}

/// Re-prompt after input of the wrong kind, e.g. text where a photo is expected.
pub fn unexpected_input(user_id: UserId, state: IntakeState) -> OutboundCommand {
    let text = match state {
        IntakeState::AwaitingPhone => "Пожалуйста, введите ваш номер телефона текстом.",
        IntakeState::AwaitingName => "Пожалуйста, введите ваше имя текстом.",
        IntakeState::AwaitingSerial => "Пожалуйста, введите серийный номер устройства (SN) текстом.",
        IntakeState::AwaitingSerialPhoto => {
            "Пожалуйста, отправьте фото серийного номера (фото или документ). \
             Вы также можете отменить операцию командой /cancel"
        }
        IntakeState::AwaitingBoxSerial => {
            "Пожалуйста, введите серийный номер с коробки (SN) текстом."
        }
        IntakeState::AwaitingBoxSerialPhoto => {
            "Пожалуйста, отправьте фото серийного номера с коробки (фото или документ). \
             Вы также можете отменить операцию командой /cancel"
        }
        IntakeState::AwaitingKit => "Пожалуйста, введите KIT номер текстом.",
        IntakeState::Done => "Заявка уже оформлена.",
    };
    OutboundCommand::text(user_id, text)
}
