//! Work items handed from the tracker to the dispatcher.

use serde::{Deserialize, Serialize};

/// One instruction awaiting execution by the agent runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskItem {
    /// Id of the chat message the instruction came from.
    pub id: i64,
    /// Trimmed instruction text.
    pub text: String,
}
