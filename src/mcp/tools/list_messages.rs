//! `list_messages` MCP tool.
//!
//! Returns the latest messages of a dialog, newest first, as
//! `{id, ts, user, text, date}` objects.

use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::util::{clamp_limit, json_result, parse_args, schema, to_mcp_error};
use crate::mcp::handler::AppState;
use crate::models::message::ChatMessage;
use crate::slack::ts::message_id_to_ts;

/// Tool name.
pub const NAME: &str = "list_messages";

/// Default number of messages returned when limit is not specified.
pub const DEFAULT_LIMIT: u16 = 20;
const MAX_LIMIT: u16 = 100;

#[derive(Debug, Deserialize)]
struct ListMessagesInput {
    dialog_id: String,
    limit: Option<i64>,
}

/// Tool definition.
#[must_use]
pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "List messages in a dialog, newest first.",
        schema(json!({
            "type": "object",
            "properties": {
                "dialog_id": { "type": "string", "description": "ID of the dialog to list messages from" },
                "limit": { "type": "integer", "minimum": 1, "maximum": MAX_LIMIT, "default": DEFAULT_LIMIT }
            },
            "required": ["dialog_id"]
        })),
    )
}

/// JSON shape of one listed message.
#[must_use]
pub fn message_entry(message: &ChatMessage) -> Value {
    json!({
        "id": message.id,
        "ts": message_id_to_ts(message.id),
        "user": message.author.as_deref().unwrap_or("unknown"),
        "text": message.text,
        "date": message.timestamp.to_rfc3339(),
    })
}

/// Handle a `list_messages` call.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on invalid arguments or chat service failures.
pub async fn handle(
    state: &AppState,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: ListMessagesInput = parse_args(NAME, arguments)?;
    let dialog_id = input.dialog_id.trim();
    if dialog_id.is_empty() {
        return Err(rmcp::ErrorData::invalid_params("dialog_id must not be empty", None));
    }
    let limit = clamp_limit(input.limit, DEFAULT_LIMIT, 1, MAX_LIMIT);

    let connection = state.connection.get().await.map_err(|e| to_mcp_error(&e))?;
    let messages = connection
        .fetch_recent(dialog_id, limit)
        .await
        .map_err(|e| to_mcp_error(&e))?;

    info!(dialog_id, count = messages.len(), "listed messages");
    let entries: Vec<Value> = messages.iter().map(message_entry).collect();
    Ok(json_result(&Value::Array(entries)))
}
