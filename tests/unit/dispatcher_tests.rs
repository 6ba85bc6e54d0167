use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_relay::models::task::TaskItem;
use agent_relay::orchestrator::runner::{AgentRunner, RunFuture};
use agent_relay::pipeline::dispatcher::Dispatcher;
use agent_relay::AppError;

/// Runner that records call order and the peak number of concurrent runs.
#[derive(Default)]
struct OverlapRunner {
    active: AtomicUsize,
    peak: AtomicUsize,
    order: Mutex<Vec<i64>>,
}

impl AgentRunner for OverlapRunner {
    fn run(&self, task: TaskItem) -> RunFuture<'_> {
        Box::pin(async move {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            self.order.lock().unwrap().push(task.id);
            self.active.fetch_sub(1, Ordering::SeqCst);

            match task.text.as_str() {
                "fail" => Err(AppError::Agent("boom".into())),
                "nonzero" => Ok(2),
                _ => Ok(0),
            }
        })
    }
}

/// Runner that panics on task 1 and records every other id.
#[derive(Default)]
struct PanickingRunner {
    ran: Mutex<Vec<i64>>,
}

impl AgentRunner for PanickingRunner {
    fn run(&self, task: TaskItem) -> RunFuture<'_> {
        Box::pin(async move {
            assert_ne!(task.id, 1, "runner blew up");
            self.ran.lock().unwrap().push(task.id);
            Ok(0)
        })
    }
}

fn task(id: i64, text: &str) -> TaskItem {
    TaskItem {
        id,
        text: text.into(),
    }
}

#[tokio::test]
async fn runs_never_overlap() {
    let runner = Arc::new(OverlapRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());

    for id in 1..=5 {
        dispatcher.enqueue(task(id, "work"));
    }
    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .expect("queue drained");

    assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.completed(), 5);
}

#[tokio::test]
async fn tasks_run_in_fifo_order() {
    let runner = Arc::new(OverlapRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());

    for id in [3, 1, 2] {
        dispatcher.enqueue(task(id, "work"));
    }
    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .expect("queue drained");

    assert_eq!(*runner.order.lock().unwrap(), vec![3, 1, 2]);
}

#[tokio::test]
async fn failures_do_not_stall_the_queue() {
    let runner = Arc::new(OverlapRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());

    dispatcher.enqueue(task(1, "fail"));
    dispatcher.enqueue(task(2, "nonzero"));
    dispatcher.enqueue(task(3, "work"));
    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .expect("queue drained");

    assert_eq!(*runner.order.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(dispatcher.completed(), 3);
    assert!(!dispatcher.is_processing());
}

#[tokio::test]
async fn first_enqueue_starts_immediately_and_rest_wait() {
    let runner = Arc::new(OverlapRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());

    dispatcher.enqueue(task(1, "work"));
    dispatcher.enqueue(task(2, "work"));

    assert!(dispatcher.is_processing());
    assert_eq!(dispatcher.queue_len(), 1);

    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .expect("queue drained");
    assert_eq!(dispatcher.queue_len(), 0);
}

#[tokio::test]
async fn drained_returns_immediately_when_idle() {
    let dispatcher = Dispatcher::new(Arc::new(OverlapRunner::default()));
    tokio::time::timeout(Duration::from_millis(100), dispatcher.drained())
        .await
        .expect("idle dispatcher is drained");
}

#[tokio::test]
async fn panicking_runner_does_not_stall_the_queue() {
    let runner = Arc::new(PanickingRunner::default());
    let dispatcher = Dispatcher::new(runner.clone());

    dispatcher.enqueue(task(1, "explode"));
    dispatcher.enqueue(task(2, "work"));
    tokio::time::timeout(Duration::from_secs(5), dispatcher.drained())
        .await
        .expect("queue drained after panic");

    assert_eq!(*runner.ran.lock().unwrap(), vec![2]);
    assert_eq!(dispatcher.completed(), 2);
    assert!(!dispatcher.is_processing());
    assert_eq!(dispatcher.queue_len(), 0);
}
