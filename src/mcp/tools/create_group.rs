//! `create_group` MCP tool.

use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::util::{json_result, parse_args, schema, to_mcp_error};
use crate::mcp::handler::AppState;

/// Tool name.
pub const NAME: &str = "create_group";

#[derive(Debug, Deserialize)]
struct CreateGroupInput {
    title: String,
    about: Option<String>,
}

/// Tool definition.
#[must_use]
pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Create a new group dialog for receiving instructions. Returns the \
         group id for use with list_messages and send_message.",
        schema(json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Name of the group" },
                "about": { "type": "string", "description": "Group description (optional)" }
            },
            "required": ["title"]
        })),
    )
}

/// Handle a `create_group` call.
///
/// # Errors
///
/// Returns `rmcp::ErrorData` on invalid arguments or creation failures.
pub async fn handle(
    state: &AppState,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    let input: CreateGroupInput = parse_args(NAME, arguments)?;
    if input.title.trim().is_empty() {
        return Err(rmcp::ErrorData::invalid_params("title must not be empty", None));
    }

    let connection = state.connection.get().await.map_err(|e| to_mcp_error(&e))?;
    let dialog = connection
        .create_group(input.title.trim(), input.about.as_deref())
        .await
        .map_err(|e| to_mcp_error(&e))?;

    info!(dialog_id = %dialog.id, "group created");
    Ok(json_result(&json!({
        "success": true,
        "id": dialog.id,
        "title": dialog.name,
        "message": format!(
            "Group \"{}\" created. Post instructions there and read them with list_messages using dialog id {}.",
            dialog.name, dialog.id
        ),
    })))
}
