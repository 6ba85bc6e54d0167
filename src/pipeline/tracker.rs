//! Dedup and cursor tracking for incoming chat messages.
//!
//! The tracker starts uninitialized. Its first batch only records the highest
//! visible message id so that history present at startup is never replayed.
//! From then on every message that is newer than the cursor, not seen before,
//! non-empty, and not agent-authored becomes exactly one [`TaskItem`].
//!
//! Agent-authored messages neither advance the cursor nor take a slot in the
//! seen set. They are re-classified whenever they reappear in a fetch window,
//! which is idempotent.

use std::collections::BTreeSet;

use crate::models::message::ChatMessage;
use crate::models::task::TaskItem;

use super::filter::is_self_authored;

/// Cursor and seen-id bookkeeping for one pipeline instance.
#[derive(Debug, Clone)]
pub struct DedupTracker {
    cursor: Option<i64>,
    seen: BTreeSet<i64>,
    capacity: usize,
}

impl DedupTracker {
    /// Create an uninitialized tracker remembering at most `capacity` ids.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cursor: None,
            seen: BTreeSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Whether the first batch has been observed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cursor.is_some()
    }

    /// Highest message id turned into a task, or the startup high-water mark.
    #[must_use]
    pub fn last_processed_id(&self) -> Option<i64> {
        self.cursor
    }

    /// Number of ids currently remembered.
    #[must_use]
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Feed one chronological batch and return the tasks it produces.
    pub fn observe(&mut self, batch: &[ChatMessage]) -> Vec<TaskItem> {
        let Some(mut cursor) = self.cursor else {
            self.cursor = Some(batch.iter().map(|m| m.id).max().unwrap_or(0).max(0));
            return Vec::new();
        };

        let mut tasks = Vec::new();
        for message in batch {
            if message.id <= cursor || self.seen.contains(&message.id) {
                continue;
            }
            let text = message.text.trim();
            if text.is_empty() || is_self_authored(text) {
                continue;
            }

            self.remember(message.id);
            cursor = cursor.max(message.id);
            tasks.push(TaskItem {
                id: message.id,
                text: text.to_owned(),
            });
        }

        self.cursor = Some(cursor);
        tasks
    }

    fn remember(&mut self, id: i64) {
        self.seen.insert(id);
        // Every remembered id is <= cursor, so evicted ids stay rejected.
        while self.seen.len() > self.capacity {
            self.seen.pop_first();
        }
    }
}
