//! Chat message and dialog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message observed in a chat dialog.
///
/// Message ids are service-assigned integers, unique and increasing within a
/// dialog. The pipeline only ever reads messages; they are never mutated once
/// observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChatMessage {
    /// Monotonic message id within the dialog.
    pub id: i64,
    /// Message body.
    pub text: String,
    /// When the service recorded the message.
    pub timestamp: DateTime<Utc>,
    /// Author id, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ChatMessage {
    /// Create a message without author information.
    #[must_use]
    pub fn new(id: i64, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            timestamp,
            author: None,
        }
    }

    /// Return the message with surrounding whitespace removed from its text,
    /// or `None` when nothing is left.
    #[must_use]
    pub fn normalized(mut self) -> Option<Self> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() != self.text.len() {
            self.text = trimmed.to_owned();
        }
        Some(self)
    }
}

/// Summary of a dialog visible to the chat connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DialogInfo {
    /// Dialog id usable with every other chat operation.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the dialog is private to its members.
    #[serde(default)]
    pub is_private: bool,
    /// Whether the connected account is a member.
    #[serde(default)]
    pub is_member: bool,
}

impl DialogInfo {
    /// Create a public dialog entry the account belongs to.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_private: false,
            is_member: true,
        }
    }
}
