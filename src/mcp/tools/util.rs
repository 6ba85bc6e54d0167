//! Shared utilities for MCP tool handlers.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::AppError;

/// Convert a `serde_json::Value::Object` into the `Arc<Map>` expected by `Tool`.
#[must_use]
pub fn schema(value: Value) -> Arc<JsonObject> {
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::default()),
    }
}

/// Deserialize tool arguments into a typed input struct.
///
/// # Errors
///
/// Returns `invalid_params` naming the tool when the arguments do not match.
pub fn parse_args<T: DeserializeOwned>(
    tool: &str,
    arguments: Option<JsonObject>,
) -> Result<T, rmcp::ErrorData> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default())).map_err(|err| {
        rmcp::ErrorData::invalid_params(format!("invalid {tool} parameters: {err}"), None)
    })
}

/// Wrap a JSON payload as a successful text result.
#[must_use]
pub fn json_result(value: &Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(value.to_string())])
}

/// Map an application error onto an MCP error.
#[must_use]
pub fn to_mcp_error(err: &AppError) -> rmcp::ErrorData {
    match err {
        AppError::Config(_) => rmcp::ErrorData::invalid_params(err.to_string(), None),
        AppError::NotFound(_) => rmcp::ErrorData::resource_not_found(err.to_string(), None),
        _ => rmcp::ErrorData::internal_error(err.to_string(), None),
    }
}

/// Clamp an optional limit into `[min, max]`, using `default` when absent.
#[must_use]
pub fn clamp_limit(limit: Option<i64>, default: u16, min: u16, max: u16) -> u16 {
    match limit {
        None => default,
        Some(v) => u16::try_from(v.clamp(i64::from(min), i64::from(max))).unwrap_or(default),
    }
}
