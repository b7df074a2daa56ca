use chrono::{Duration, NaiveDateTime};
use common::misc::{RequestKind, SUBSCRIPTION_DAYS, format_request_number};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    Pending,
    PaymentConfirmed,
    Completed,
}

impl ActivationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationStatus::Pending => "pending",
            ActivationStatus::PaymentConfirmed => "payment_confirmed",
            ActivationStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub id: i64,
    pub user_id: i64,
    pub phone: String,
    pub name: String,
    pub username: Option<String>,
    pub created_at: NaiveDateTime,
    pub payment_received: bool,
    #[sqlx(rename = "receipt_file_id")]
    pub receipt_reference: Option<String>,
    pub serial_number: Option<String>,
    #[sqlx(rename = "serial_photo_file_id")]
    pub serial_photo_reference: Option<String>,
    pub box_serial_number: Option<String>,
    #[sqlx(rename = "box_serial_photo_file_id")]
    pub box_serial_photo_reference: Option<String>,
    pub kit_number: Option<String>,
    pub status: ActivationStatus,
    pub service_provided: bool,
    pub service_provided_at: Option<NaiveDateTime>,
    pub last_reminder_day: Option<i64>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl ActivationRequest {
    pub fn request_number(&self) -> String {
        format_request_number(RequestKind::Activation, self.id)
    }

    /// End of the subscription window, once the activation has been serviced.
    pub fn subscription_end(&self) -> Option<NaiveDateTime> {
        self.service_provided_at.map(subscription_end)
    }
}

pub fn subscription_end(service_provided_at: NaiveDateTime) -> NaiveDateTime {
    service_provided_at + Duration::days(SUBSCRIPTION_DAYS)
}

/// Serviced activation considered by the reminder sweep.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReminderCandidate {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub service_provided_at: NaiveDateTime,
    pub last_reminder_day: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_purchases: i64,
    pub total_activations: i64,
    pub pending_activations: i64,
    pub payment_confirmed: i64,
    pub completed_activations: i64,
}
