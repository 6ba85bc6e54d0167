use agent_relay::models::message::ChatMessage;
use agent_relay::models::task::TaskItem;
use agent_relay::pipeline::tracker::DedupTracker;
use chrono::Utc;

fn msg(id: i64, text: &str) -> ChatMessage {
    ChatMessage::new(id, text, Utc::now())
}

fn batch(items: &[(i64, &str)]) -> Vec<ChatMessage> {
    items.iter().map(|(id, text)| msg(*id, text)).collect()
}

#[test]
fn cold_start_does_not_replay_history() {
    let mut tracker = DedupTracker::new(64);
    let tasks = tracker.observe(&batch(&[(1, "old"), (2, "older"), (3, "oldest")]));
    assert!(tasks.is_empty());
    assert_eq!(tracker.last_processed_id(), Some(3));

    // Same window again: still nothing.
    assert!(tracker
        .observe(&batch(&[(1, "old"), (2, "older"), (3, "oldest")]))
        .is_empty());
}

#[test]
fn cursor_equals_highest_enqueued_id() {
    let mut tracker = DedupTracker::new(64);
    tracker.observe(&batch(&[(10, "seed")]));
    let tasks = tracker.observe(&batch(&[(10, "seed"), (11, "a"), (12, "b")]));
    assert_eq!(tasks.len(), 2);
    assert_eq!(tracker.last_processed_id(), Some(12));
}

#[test]
fn overlapping_windows_yield_each_message_once() {
    let mut tracker = DedupTracker::new(64);
    tracker.observe(&batch(&[(4, "seed")]));

    let first = tracker.observe(&batch(&[(5, "five"), (6, "six"), (7, "seven")]));
    let second = tracker.observe(&batch(&[(6, "six"), (7, "seven"), (8, "eight")]));

    let ids: Vec<i64> = first.iter().chain(second.iter()).map(|t| t.id).collect();
    assert_eq!(ids, vec![5, 6, 7, 8]);
}

#[test]
fn self_authored_messages_are_excluded() {
    let mut tracker = DedupTracker::new(64);
    tracker.observe(&[]);

    let tasks = tracker.observe(&batch(&[
        (1, "[bot] test"),
        (2, "Done ✓ all green"),
        (3, "real instruction"),
    ]));
    assert_eq!(
        tasks,
        vec![TaskItem {
            id: 3,
            text: "real instruction".into()
        }]
    );
}

#[test]
fn self_authored_messages_do_not_move_cursor() {
    let mut tracker = DedupTracker::new(64);
    tracker.observe(&batch(&[(1, "seed")]));

    assert!(tracker.observe(&batch(&[(2, "[bot] starting")])).is_empty());
    assert_eq!(tracker.last_processed_id(), Some(1));
    assert_eq!(tracker.seen_len(), 0);
}

#[test]
fn init_then_new_message_produces_one_task() {
    let mut tracker = DedupTracker::new(64);
    assert!(tracker.observe(&batch(&[(1, "hello")])).is_empty());

    let tasks = tracker.observe(&batch(&[(1, "hello"), (2, "do X")]));
    assert_eq!(
        tasks,
        vec![TaskItem {
            id: 2,
            text: "do X".into()
        }]
    );
}

#[test]
fn blank_messages_are_skipped() {
    let mut tracker = DedupTracker::new(64);
    tracker.observe(&[]);
    assert!(tracker.observe(&batch(&[(1, "   "), (2, "")])).is_empty());
    assert_eq!(tracker.last_processed_id(), Some(0));
}

#[test]
fn task_text_is_trimmed() {
    let mut tracker = DedupTracker::new(64);
    tracker.observe(&[]);
    let tasks = tracker.observe(&batch(&[(1, "  run tests \n")]));
    assert_eq!(tasks[0].text, "run tests");
}

#[test]
fn ids_below_cursor_arriving_late_are_rejected() {
    let mut tracker = DedupTracker::new(64);
    tracker.observe(&batch(&[(5, "seed")]));
    tracker.observe(&batch(&[(9, "nine")]));
    assert!(tracker.observe(&batch(&[(7, "late")])).is_empty());
}
