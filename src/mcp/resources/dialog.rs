//! `chat://dialog/{id}/recent` MCP resource.
//!
//! Exposes the configured dialog's latest messages as a markdown digest so
//! a host assistant can read pending instructions without a tool call.

use chrono::Utc;
use rmcp::model::{
    Annotated, ListResourcesResult, RawResource, ReadResourceResult, ResourceContents,
};
use tracing::info;

use crate::digest::render_digest;
use crate::mcp::handler::AppState;
use crate::pipeline::source::normalize;
use crate::{AppError, Result};

/// Number of messages included in the digest.
pub const DEFAULT_LIMIT: u16 = 20;

/// Human-readable name for this resource.
pub const RESOURCE_NAME: &str = "Chat Dialog Instructions";

const RESOURCE_DESCRIPTION: &str =
    "Latest messages of the configured dialog as a markdown digest, oldest first.";

/// Resource URI for `dialog_id`.
#[must_use]
pub fn dialog_uri(dialog_id: &str) -> String {
    format!("chat://dialog/{dialog_id}/recent")
}

/// Parse a `chat://dialog/{id}/recent` URI and return the dialog id.
///
/// ```
/// use agent_relay::mcp::resources::dialog::parse_dialog_uri;
///
/// assert_eq!(parse_dialog_uri("chat://dialog/C012345/recent"), Some("C012345"));
/// assert_eq!(parse_dialog_uri("http://example.com"), None);
/// ```
#[must_use]
pub fn parse_dialog_uri(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("chat://dialog/")?;
    let (dialog_id, suffix) = rest.split_once('/')?;
    if suffix != "recent" || dialog_id.is_empty() {
        return None;
    }
    Some(dialog_id)
}

/// Resources available for the configured dialog; empty when none is set.
#[must_use]
pub fn list_resources(dialog_id: Option<&str>) -> ListResourcesResult {
    let resources = dialog_id
        .map(|id| {
            let mut raw = RawResource::new(dialog_uri(id), RESOURCE_NAME);
            raw.description = Some(RESOURCE_DESCRIPTION.into());
            raw.mime_type = Some("text/markdown".into());
            Annotated::new(raw, None)
        })
        .into_iter()
        .collect();

    ListResourcesResult {
        resources,
        next_cursor: None,
        meta: None,
    }
}

/// Handle `resources/read` for the dialog digest.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown URI or a dialog other than
/// the configured one, or `AppError::Slack` if fetching fails.
pub async fn read_resource(uri: &str, state: &AppState) -> Result<ReadResourceResult> {
    let dialog_id = parse_dialog_uri(uri).ok_or_else(|| {
        AppError::NotFound(format!(
            "invalid resource URI: expected chat://dialog/{{id}}/recent, got '{uri}'"
        ))
    })?;

    let configured = state.config.slack.channel_id.trim();
    if dialog_id != configured {
        return Err(AppError::NotFound(format!(
            "dialog '{dialog_id}' is not the configured dialog"
        )));
    }

    info!(dialog_id, "reading dialog digest resource");
    let connection = state.connection.get().await?;
    let mut messages = connection.fetch_recent(dialog_id, DEFAULT_LIMIT).await?;
    messages.reverse();
    let messages = normalize(messages);

    let body = render_digest(dialog_id, &messages, Utc::now());
    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(body, uri)],
    })
}
