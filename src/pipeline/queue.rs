//! FIFO of instructions waiting for the agent.

use std::collections::VecDeque;

use crate::models::task::TaskItem;

/// Unbounded in-memory FIFO of pending tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    items: VecDeque<TaskItem>,
}

impl TaskQueue {
    /// Append a task at the back.
    pub fn push(&mut self, task: TaskItem) {
        self.items.push_back(task);
    }

    /// Remove the oldest task.
    pub fn pop(&mut self) -> Option<TaskItem> {
        self.items.pop_front()
    }

    /// Number of waiting tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no task is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
