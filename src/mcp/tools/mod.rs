//! MCP tool handlers.

pub mod create_group;
pub mod list_dialogs;
pub mod list_messages;
pub mod send_message;
pub mod util;

use rmcp::model::{CallToolResult, JsonObject, Tool};

use crate::mcp::handler::AppState;

/// Every tool the server exposes.
#[must_use]
pub fn all_tools() -> Vec<Tool> {
    vec![
        list_dialogs::tool(),
        list_messages::tool(),
        send_message::tool(),
        create_group::tool(),
    ]
}

/// Route a tool call by name.
///
/// # Errors
///
/// Returns `invalid_params` for unknown tools, otherwise the handler's error.
pub async fn dispatch(
    state: &AppState,
    name: &str,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    match name {
        list_dialogs::NAME => list_dialogs::handle(state, arguments).await,
        list_messages::NAME => list_messages::handle(state, arguments).await,
        send_message::NAME => send_message::handle(state, arguments).await,
        create_group::NAME => create_group::handle(state, arguments).await,
        other => Err(rmcp::ErrorData::invalid_params(
            format!("unknown tool: {other}"),
            None,
        )),
    }
}
