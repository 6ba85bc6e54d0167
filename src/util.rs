//! Small text helpers shared by the pipeline, the CLI, and the MCP tools.

/// Maximum length of a Slack channel name.
const MAX_CHANNEL_NAME_LEN: usize = 80;

/// Shorten `text` to at most `max_chars` characters, appending `"..."` when
/// anything was cut.
#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        None => text.to_owned(),
        Some((boundary, _)) => format!("{}...", &text[..boundary]),
    }
}

/// Normalize a free-form title into a valid Slack channel name.
///
/// Lowercases, maps whitespace and separators to `-`, drops every other
/// character outside `[a-z0-9_-]`, collapses repeated dashes, and caps the
/// result at 80 characters.
#[must_use]
pub fn slack_channel_name(title: &str) -> String {
    let mut name = String::with_capacity(title.len());
    for c in title.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match c {
            'a'..='z' | '0'..='9' | '_' => Some(c),
            '-' | '.' | '/' => Some('-'),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        };
        if let Some(m) = mapped {
            if m == '-' && name.ends_with('-') {
                continue;
            }
            name.push(m);
        }
    }
    let trimmed = name.trim_matches('-');
    trimmed.chars().take(MAX_CHANNEL_NAME_LEN).collect()
}
