//! Slack message timestamp conversions.
//!
//! Slack identifies messages by `"<seconds>.<micros>"` strings. The pipeline
//! wants integer ids that increase within a dialog, so a timestamp maps to
//! `seconds * 1_000_000 + micros`.

use chrono::{DateTime, Utc};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Convert a Slack `ts` string into an integer message id.
///
/// Fractional digits beyond six are ignored; fewer are right-padded.
#[must_use]
pub fn ts_to_message_id(ts: &str) -> Option<i64> {
    let (secs, frac) = ts.trim().split_once('.').unwrap_or((ts.trim(), ""));
    let secs: i64 = secs.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits: String = frac.chars().take(6).collect();
    while digits.len() < 6 {
        digits.push('0');
    }
    let micros: i64 = digits.parse().ok()?;
    secs.checked_mul(MICROS_PER_SECOND)?.checked_add(micros)
}

/// Inverse of [`ts_to_message_id`].
#[must_use]
pub fn message_id_to_ts(id: i64) -> String {
    format!(
        "{}.{:06}",
        id.div_euclid(MICROS_PER_SECOND),
        id.rem_euclid(MICROS_PER_SECOND)
    )
}

/// Wall-clock time a Slack `ts` refers to.
#[must_use]
pub fn ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let id = ts_to_message_id(ts)?;
    DateTime::<Utc>::from_timestamp_micros(id)
}
