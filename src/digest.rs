//! Markdown digest of a dialog's latest messages.
//!
//! Used by the `poll` subcommand (written to a file in the workspace) and by
//! the `chat://dialog/{id}/recent` MCP resource.

use std::path::Path;

use chrono::{DateTime, Local, SecondsFormat, Utc};

use crate::models::message::ChatMessage;
use crate::{AppError, Result};

/// Render `messages` (chronological) as a markdown digest.
#[must_use]
pub fn render_digest(dialog_id: &str, messages: &[ChatMessage], now: DateTime<Utc>) -> String {
    let mut out = format!(
        "# Instructions from {dialog_id}\n\n*Last updated: {}*\n\n---\n\n",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    for message in messages {
        let local = message.timestamp.with_timezone(&Local);
        out.push_str(&format!(
            "**{}**\n\n{}\n\n---\n\n",
            local.format("%Y-%m-%d %H:%M"),
            message.text
        ));
    }
    out
}

/// Write a rendered digest to `path`, replacing previous content.
///
/// # Errors
///
/// Returns `AppError::Io` if the file cannot be written.
pub async fn write_digest(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|err| AppError::Io(format!("failed to write {}: {err}", path.display())))
}
