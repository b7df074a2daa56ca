use chrono::NaiveDateTime;
use common::misc::{RequestKind, format_request_number};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: i64,
    pub user_id: i64,
    pub phone: String,
    pub name: String,
    pub username: Option<String>,
    pub created_at: NaiveDateTime,
}

impl PurchaseRequest {
    pub fn request_number(&self) -> String {
        format_request_number(RequestKind::Purchase, self.id)
    }
}
