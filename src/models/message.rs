use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::enums::Sender;

/// One entry in the chat history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_booking_confirmation: bool,
}

impl ChatMessage {
    fn new(content: impl Into<String>, sender: Sender, is_booking_confirmation: bool) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        Self {
            id: new_message_id(timestamp),
            content: content.into(),
            sender,
            timestamp,
            is_booking_confirmation,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User, false)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(content, Sender::Bot, false)
    }

    pub fn booking_confirmation(content: impl Into<String>) -> Self {
        Self::new(content, Sender::Bot, true)
    }
}

/// `<millis>-<random hex>`: sortable by creation time, unique within a session.
pub fn new_message_id(timestamp_millis: i64) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{timestamp_millis}-{suffix:08x}")
}
