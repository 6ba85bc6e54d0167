use agent_relay::digest::{render_digest, write_digest};
use agent_relay::models::message::ChatMessage;
use chrono::{TimeZone, Utc};

fn at(secs: i64, id: i64, text: &str) -> ChatMessage {
    ChatMessage::new(id, text, Utc.timestamp_opt(secs, 0).unwrap())
}

#[test]
fn digest_has_header_and_timestamp() {
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let digest = render_digest("C42", &[], now);
    assert!(digest.starts_with("# Instructions from C42\n"));
    assert!(digest.contains("*Last updated: 2026-01-02T03:04:05Z*"));
}

#[test]
fn digest_keeps_message_order() {
    let messages = vec![at(1_700_000_000, 1, "first"), at(1_700_000_060, 2, "second")];
    let digest = render_digest("C1", &messages, Utc::now());
    let first = digest.find("first").unwrap();
    let second = digest.find("second").unwrap();
    assert!(first < second);
    assert_eq!(digest.matches("\n---\n").count(), 3);
}

#[tokio::test]
async fn digest_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".vibe-instructions.md");
    write_digest(&path, "old").await.unwrap();
    write_digest(&path, "new").await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
}
