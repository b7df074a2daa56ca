use chrono::NaiveDateTime;
use common::events::{OutboundCommand, UserId};
use db::models::activation::ActivationRequest;

const HEADERS: [&str; 14] = [
    "Номер заявки",
    "User ID",
    "Username",
    "Номер телефона",
    "Имя",
    "Дата заявки",
    "Услуга",
    "SN устройство",
    "SN коробка",
    "KIT номер",
    "Дата начала активации",
    "Дата окончания подписки",
    "Email",
    "Пароль",
];

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Activation table as CSV, one row per request, header first.
pub fn activations_csv(activations: &[ActivationRequest]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADERS.iter().map(|h| h.to_string()));
    for activation in activations {
        push_row(&mut out, row(activation).into_iter());
    }
    out
}

fn row(activation: &ActivationRequest) -> Vec<String> {
    let stamp = |value: Option<NaiveDateTime>| {
        value
            .map(|v| v.format(TIMESTAMP).to_string())
            .unwrap_or_default()
    };
    let opt = |value: &Option<String>| value.clone().unwrap_or_default();

    vec![
        activation.request_number(),
        activation.user_id.to_string(),
        activation
            .username
            .as_ref()
            .map(|u| format!("@{u}"))
            .unwrap_or_default(),
        activation.phone.clone(),
        activation.name.clone(),
        activation.created_at.format(TIMESTAMP).to_string(),
        "Активация".to_string(),
        opt(&activation.serial_number),
        opt(&activation.box_serial_number),
        opt(&activation.kit_number),
        stamp(activation.service_provided_at),
        stamp(activation.subscription_end()),
        opt(&activation.email),
        opt(&activation.password),
    ]
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let line: Vec<String> = fields.map(|field| escape(&field)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// Quotes a field when it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Export of every activation, named after the moment it was taken.
pub fn export_all(
    user_id: UserId,
    activations: &[ActivationRequest],
    now: NaiveDateTime,
) -> OutboundCommand {
    let filename = format!("activations_{}.csv", now.format("%Y%m%d_%H%M%S"));
    OutboundCommand::document(user_id, filename, with_bom(activations_csv(activations)).as_slice())
}

pub fn export_one(
    user_id: UserId,
    activation: &ActivationRequest,
    now: NaiveDateTime,
) -> OutboundCommand {
    let filename = format!(
        "activation_{}_{}.csv",
        activation.request_number(),
        now.format("%Y%m%d_%H%M%S")
    );
    let csv = activations_csv(std::slice::from_ref(activation));
    OutboundCommand::document(user_id, filename, with_bom(csv).as_slice())
}

/// Spreadsheet tools need the BOM to read UTF-8 CSV correctly.
fn with_bom(csv: String) -> Vec<u8> {
    let mut bytes = "\u{feff}".as_bytes().to_vec();
    bytes.extend_from_slice(csv.as_bytes());
    bytes
}
