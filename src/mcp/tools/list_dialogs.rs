//! `list_dialogs` MCP tool.

use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::util::{clamp_limit, json_result, parse_args, schema, to_mcp_error};
use crate::mcp::handler::AppState;

/// Tool name.
pub const NAME: &str = "list_dialogs";

const DEFAULT_LIMIT: u16 = 100;
const MAX_LIMIT: u16 = 1000;

#[derive(Debug, Default, Deserialize)]
struct ListDialogsInput {
    limit: Option<i64>,
}

/// Tool definition.
#[must_use]
pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "List the dialogs (channels and groups) the bot can see. \
         Use the returned id with list_messages and send_message.",
        schema(json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "minimum": 1, "maximum": MAX_LIMIT, "default": DEFAULT_LIMIT }
            }
        })),
    )
}

/// Handle a `list_dialogs` call.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on invalid arguments or chat service failures.
pub async fn handle(
    state: &AppState,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: ListDialogsInput = parse_args(NAME, arguments)?;
    let limit = clamp_limit(input.limit, DEFAULT_LIMIT, 1, MAX_LIMIT);

    let connection = state.connection.get().await.map_err(|e| to_mcp_error(&e))?;
    let dialogs = connection
        .list_dialogs(limit)
        .await
        .map_err(|e| to_mcp_error(&e))?;

    info!(count = dialogs.len(), "listed dialogs");
    Ok(json_result(&json!(dialogs)))
}
