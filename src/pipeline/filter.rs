//! Classification of agent-authored messages.
//!
//! The agent is told to prefix every status message it posts with
//! [`BOT_PREFIX`]. Progress phrases that agents tend to emit without the
//! prefix are matched as well, so the pipeline never treats its own
//! broadcasts as new instructions.

/// Literal marker the agent prefixes its chat messages with.
pub const BOT_PREFIX: &str = "[bot]";

/// Status phrases used by agent progress reports.
pub const STATUS_PREFIXES: &[&str] = &["Starting:", "Done ✓", "Yes —", "New approach:", "Update:"];

/// Whether `text` was produced by the agent itself.
///
/// Case-sensitive prefix match against [`BOT_PREFIX`] and
/// [`STATUS_PREFIXES`]. Callers pass trimmed text.
#[must_use]
pub fn is_self_authored(text: &str) -> bool {
    text.starts_with(BOT_PREFIX) || STATUS_PREFIXES.iter().any(|p| text.starts_with(p))
}
