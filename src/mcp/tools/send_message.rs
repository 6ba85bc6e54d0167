//! `send_message` MCP tool.

use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::util::{json_result, parse_args, schema, to_mcp_error};
use crate::mcp::handler::AppState;

/// Tool name.
pub const NAME: &str = "send_message";

#[derive(Debug, Deserialize)]
struct SendMessageInput {
    dialog_id: String,
    message: String,
}

/// Tool definition.
#[must_use]
pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Send a message to a dialog. Use this to post progress updates, \
         completion status, or replies.",
        schema(json!({
            "type": "object",
            "properties": {
                "dialog_id": { "type": "string", "description": "ID of the dialog to send to" },
                "message": { "type": "string", "description": "Message text to send" }
            },
            "required": ["dialog_id", "message"]
        })),
    )
}

/// Handle a `send_message` call.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on invalid arguments or delivery failures.
pub async fn handle(
    state: &AppState,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: SendMessageInput = parse_args(NAME, arguments)?;
    let dialog_id = input.dialog_id.trim();
    if dialog_id.is_empty() {
        return Err(rmcp::ErrorData::invalid_params("dialog_id must not be empty", None));
    }
    if input.message.trim().is_empty() {
        return Err(rmcp::ErrorData::invalid_params("message must not be empty", None));
    }

    let connection = state.connection.get().await.map_err(|e| to_mcp_error(&e))?;
    connection
        .send_message(dialog_id, &input.message)
        .await
        .map_err(|e| to_mcp_error(&e))?;

    info!(dialog_id, "message sent");
    Ok(json_result(&json!({ "success": true, "message": "Message sent" })))
}
