//! Wire types exchanged with the chat gateway.
//!
//! The gateway owns the actual messenger connection. It posts one
//! [`InboundEvent`] per user action and executes the [`OutboundCommand`]s it
//! gets back (or receives them on its webhook for unsolicited messages).

use base64::{Engine, engine::general_purpose};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    Text {
        user_id: UserId,
        #[serde(default)]
        username: Option<String>,
        text: String,
    },
    Photo {
        user_id: UserId,
        file_ref: String,
    },
    Document {
        user_id: UserId,
        file_ref: String,
    },
    Button {
        user_id: UserId,
        action_id: String,
    },
    PaymentConfirmed {
        user_id: UserId,
        charge_ref: String,
        amount: i64,
    },
    PreCheckout {
        user_id: UserId,
        query_id: String,
    },
    SessionReset {
        user_id: UserId,
    },
}

impl InboundEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            InboundEvent::Text { user_id, .. }
            | InboundEvent::Photo { user_id, .. }
            | InboundEvent::Document { user_id, .. }
            | InboundEvent::Button { user_id, .. }
            | InboundEvent::PaymentConfirmed { user_id, .. }
            | InboundEvent::PreCheckout { user_id, .. }
            | InboundEvent::SessionReset { user_id } => *user_id,
        }
    }

    /// Slash command carried by a text event, e.g. `start` for `/start`.
    pub fn command(&self) -> Option<&str> {
        match self {
            InboundEvent::Text { text, .. } => {
                let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
                // "/start@SomeBot" addresses the bot explicitly in group chats
                Some(word.split('@').next().unwrap_or(word))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action_id: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_id: action_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundCommand {
    SendText {
        user_id: UserId,
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        buttons: Vec<Vec<Button>>,
    },
    SendPhoto {
        user_id: UserId,
        image: String,
        caption: String,
    },
    SendDocument {
        user_id: UserId,
        filename: String,
        /// base64 of the file bytes
        content: String,
    },
    AnswerPreCheckout {
        query_id: String,
        ok: bool,
    },
}

impl OutboundCommand {
    pub fn text(user_id: UserId, text: impl Into<String>) -> Self {
        OutboundCommand::SendText {
            user_id,
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// Text with an inline keyboard, one row per inner vector.
    pub fn text_with_buttons(
        user_id: UserId,
        text: impl Into<String>,
        buttons: Vec<Vec<Button>>,
    ) -> Self {
        OutboundCommand::SendText {
            user_id,
            text: text.into(),
            buttons,
        }
    }

    pub fn photo(user_id: UserId, image: impl Into<String>, caption: impl Into<String>) -> Self {
        OutboundCommand::SendPhoto {
            user_id,
            image: image.into(),
            caption: caption.into(),
        }
    }

    pub fn document(user_id: UserId, filename: impl Into<String>, bytes: &[u8]) -> Self {
        OutboundCommand::SendDocument {
            user_id,
            filename: filename.into(),
            content: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Recipient of the command, if it targets a user.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            OutboundCommand::SendText { user_id, .. }
            | OutboundCommand::SendPhoto { user_id, .. }
            | OutboundCommand::SendDocument { user_id, .. } => Some(*user_id),
            OutboundCommand::AnswerPreCheckout { .. } => None,
        }
    }
}
