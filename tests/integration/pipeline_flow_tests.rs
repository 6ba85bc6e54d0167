//! End-to-end pipeline behaviour: source → tracker → dispatcher → runner.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use agent_relay::models::message::ChatMessage;
use agent_relay::models::task::TaskItem;
use agent_relay::pipeline::dispatcher::Dispatcher;
use agent_relay::pipeline::source::{BatchFuture, MessageSource, PollSource};
use agent_relay::pipeline::tracker::DedupTracker;
use agent_relay::{pipeline, AppError, Result};
use chrono::Utc;

use super::test_helpers::{wait_until, FakeConnection, RecordingRunner};

/// Source replaying a fixed script of batches, then closing.
struct ScriptedSource {
    script: VecDeque<Result<Vec<ChatMessage>>>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<Vec<(i64, &str)>>>) -> Self {
        let script = script
            .into_iter()
            .map(|step| {
                step.map(|batch| {
                    batch
                        .into_iter()
                        .map(|(id, text)| ChatMessage::new(id, text, Utc::now()))
                        .collect()
                })
            })
            .collect();
        Self { script }
    }
}

impl MessageSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn next_batch(&mut self) -> BatchFuture<'_> {
        Box::pin(async move { self.script.pop_front().transpose() })
    }
}

#[tokio::test]
async fn init_then_new_message_runs_once() {
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());
    let source = ScriptedSource::new(vec![Ok(vec![(1, "hello")]), Ok(vec![(1, "hello"), (2, "do X")])]);

    let result = pipeline::run(source, DedupTracker::new(64), dispatcher.clone()).await;
    assert!(matches!(result, Err(AppError::Ipc(_))));

    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .unwrap();
    let tasks = runner.tasks.lock().unwrap().clone();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, 2);
    assert_eq!(tasks[0].text, "do X");
}

#[tokio::test]
async fn new_message_waits_in_queue_behind_running_agent() {
    let runner = Arc::new(RecordingRunner::with_delay(Duration::from_millis(300)));
    let dispatcher = Dispatcher::new(runner.clone());
    dispatcher.enqueue(TaskItem {
        id: 99,
        text: "already running".into(),
    });
    let source = ScriptedSource::new(vec![Ok(vec![(1, "hello")]), Ok(vec![(1, "hello"), (2, "do X")])]);

    let result = pipeline::run(source, DedupTracker::new(64), dispatcher.clone()).await;
    assert!(matches!(result, Err(AppError::Ipc(_))));

    assert!(dispatcher.is_processing());
    assert_eq!(dispatcher.queue_len(), 1);

    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .unwrap();
    let tasks = runner.tasks.lock().unwrap().clone();
    assert_eq!(
        tasks,
        vec![
            TaskItem { id: 99, text: "already running".into() },
            TaskItem { id: 2, text: "do X".into() },
        ]
    );
}

#[tokio::test]
async fn transient_errors_keep_the_loop_alive() {
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());
    let source = ScriptedSource::new(vec![
        Ok(vec![(1, "seed")]),
        Err(AppError::Slack("timeout".into())),
        Ok(vec![(1, "seed"), (2, "next")]),
        Err(AppError::Slack("timeout".into())),
        Ok(vec![(2, "next"), (3, "[bot] Starting: next"), (4, "last")]),
    ]);

    let _ = pipeline::run(source, DedupTracker::new(64), dispatcher.clone()).await;
    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .unwrap();

    assert_eq!(runner.ids(), vec![2, 4]);
}

#[tokio::test]
async fn queued_instructions_run_one_at_a_time_in_order() {
    let runner = Arc::new(RecordingRunner::with_delay(Duration::from_millis(20)));
    let dispatcher = Dispatcher::new(runner.clone());
    let source = ScriptedSource::new(vec![
        Ok(vec![]),
        Ok(vec![(1, "a"), (2, "b")]),
        Ok(vec![(3, "c")]),
        Ok(vec![(2, "b"), (3, "c"), (4, "d")]),
    ]);

    let _ = pipeline::run(source, DedupTracker::new(64), dispatcher.clone()).await;
    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .unwrap();

    assert_eq!(runner.ids(), vec![1, 2, 3, 4]);
    assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn poll_source_feeds_pipeline_from_connection() {
    let connection = Arc::new(FakeConnection::default());
    connection.post(100, "history");

    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());
    let source = PollSource::new(connection.clone(), "C_TEST", 20, Duration::from_millis(10));
    let handle = tokio::spawn(pipeline::run(source, DedupTracker::new(64), dispatcher.clone()));

    assert!(wait_until(Duration::from_secs(2), || connection.fetches.load(Ordering::SeqCst) >= 2).await);
    connection.post(101, "  build it  ");
    connection.post(102, "[bot] Done ✓ build it");

    assert!(wait_until(Duration::from_secs(2), || runner.ids() == vec![101]).await);
    handle.abort();

    let tasks = runner.tasks.lock().unwrap().clone();
    assert_eq!(tasks[0].text, "build it");
}

#[tokio::test]
async fn poll_source_survives_fetch_failures() {
    let connection = Arc::new(FakeConnection::default());
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());

    connection.fail_fetch.store(true, Ordering::SeqCst);
    let source = PollSource::new(connection.clone(), "C_TEST", 20, Duration::from_millis(10));
    let handle = tokio::spawn(pipeline::run(source, DedupTracker::new(64), dispatcher.clone()));

    assert!(wait_until(Duration::from_secs(2), || connection.fetches.load(Ordering::SeqCst) >= 3).await);
    connection.fail_fetch.store(false, Ordering::SeqCst);
    let before = connection.fetches.load(Ordering::SeqCst);
    assert!(wait_until(Duration::from_secs(2), || connection.fetches.load(Ordering::SeqCst) >= before + 2).await);

    connection.post(1, "after recovery");
    assert!(wait_until(Duration::from_secs(2), || runner.ids() == vec![1]).await);
    handle.abort();
}
