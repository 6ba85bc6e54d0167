//! Wire record for one pushed chat message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::message::ChatMessage;

/// `{"id": …, "text": …, "date": …}`. `date` is unix seconds and optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    /// Message id.
    pub id: i64,
    /// Message text.
    pub text: String,
    /// Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
}

impl MessageRecord {
    /// Parse one line. Malformed lines yield `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        serde_json::from_str(line).ok()
    }

    /// Serialize to a single line without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; plain records never fail in practice.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&ChatMessage> for MessageRecord {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            text: message.text.clone(),
            date: Some(message.timestamp.timestamp()),
        }
    }
}

impl From<MessageRecord> for ChatMessage {
    fn from(record: MessageRecord) -> Self {
        let timestamp = record
            .date
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);
        ChatMessage::new(record.id, record.text, timestamp)
    }
}
