use agent_relay::ipc::codec::RecordCodec;
use agent_relay::ipc::record::MessageRecord;
use agent_relay::models::message::ChatMessage;
use bytes::BytesMut;
use chrono::{TimeZone, Utc};
use tokio_util::codec::{Decoder, Encoder};

#[test]
fn decodes_complete_lines() {
    let mut codec = RecordCodec::new();
    let mut buf = BytesMut::from("{\"id\":1,\"text\":\"a\"}\n{\"id\":2,\"text\":\"b\"}\n");
    assert_eq!(
        codec.decode(&mut buf).unwrap().as_deref(),
        Some("{\"id\":1,\"text\":\"a\"}")
    );
    assert_eq!(
        codec.decode(&mut buf).unwrap().as_deref(),
        Some("{\"id\":2,\"text\":\"b\"}")
    );
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
}

#[test]
fn partial_line_waits_for_newline() {
    let mut codec = RecordCodec::new();
    let mut buf = BytesMut::from("{\"id\":1,");
    assert_eq!(codec.decode(&mut buf).unwrap(), None);

    buf.extend_from_slice(b"\"text\":\"a\"}\n");
    assert_eq!(
        codec.decode(&mut buf).unwrap().as_deref(),
        Some("{\"id\":1,\"text\":\"a\"}")
    );
}

#[test]
fn oversized_line_is_skipped() {
    let mut codec = RecordCodec::with_max_length(16);
    let long = "x".repeat(64);
    let mut buf = BytesMut::from(format!("{long}\nshort\n").as_str());
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("short"));
}

#[test]
fn non_utf8_line_is_skipped() {
    let mut codec = RecordCodec::new();
    let mut buf = BytesMut::from(&b"\xff\xfe garbled\nshort\n"[..]);
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("short"));
}

#[test]
fn non_utf8_trailing_line_is_skipped_at_eof() {
    let mut codec = RecordCodec::new();
    let mut buf = BytesMut::from(&b"\xff\xfe"[..]);
    assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
}

#[test]
fn encode_appends_newline() {
    let mut codec = RecordCodec::new();
    let mut buf = BytesMut::new();
    codec.encode("{\"id\":1}".to_owned(), &mut buf).unwrap();
    assert_eq!(&buf[..], b"{\"id\":1}\n");
}

#[test]
fn record_parses_with_and_without_date() {
    let with = MessageRecord::parse(r#"{"id":5,"text":"hi","date":1700000000}"#).unwrap();
    assert_eq!(with.date, Some(1_700_000_000));

    let without = MessageRecord::parse(r#"{"id":6,"text":"yo"}"#).unwrap();
    assert_eq!(without.id, 6);
    assert_eq!(without.date, None);
}

#[test]
fn malformed_records_are_none() {
    assert!(MessageRecord::parse("").is_none());
    assert!(MessageRecord::parse("not json").is_none());
    assert!(MessageRecord::parse(r#"{"text":"no id"}"#).is_none());
    assert!(MessageRecord::parse(r#"{"id":"seven","text":"x"}"#).is_none());
}

#[test]
fn record_converts_to_message() {
    let record = MessageRecord {
        id: 9,
        text: "run".into(),
        date: Some(1_700_000_000),
    };
    let message = ChatMessage::from(record);
    assert_eq!(message.id, 9);
    assert_eq!(message.timestamp, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
}

#[test]
fn record_line_omits_missing_date() {
    let record = MessageRecord {
        id: 1,
        text: "t".into(),
        date: None,
    };
    assert_eq!(record.to_line().unwrap(), r#"{"id":1,"text":"t"}"#);
}
