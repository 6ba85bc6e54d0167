//! Prompt construction for agent runs.

use crate::pipeline::filter::BOT_PREFIX;

/// Build the prompt handed to the agent for one instruction.
///
/// The instruction comes first, followed by a reminder to report progress
/// into `dialog_id` through the `send_message` tool with every message
/// prefixed by [`BOT_PREFIX`], so the pipeline never mistakes the agent's
/// own reports for new instructions.
#[must_use]
pub fn build_prompt(instruction: &str, dialog_id: &str) -> String {
    format!(
        "Execute this instruction from the chat:\n\n\
         {instruction}\n\n\
         REQUIRED: report back to the chat with the `send_message` MCP tool \
         using dialog_id=\"{dialog_id}\".\n\
         - Prefix every message with \"{BOT_PREFIX}\".\n\
         - Send a short message when you start.\n\
         - Send updates at meaningful milestones.\n\
         - Send a final message on completion or error with a brief summary."
    )
}
