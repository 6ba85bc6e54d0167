//! Serializing dispatch loop.
//!
//! [`Dispatcher::enqueue`] pushes onto the [`TaskQueue`] and pumps. A pump
//! only starts a run when the `processing` flag is clear; it sets the flag,
//! pops the oldest task, and spawns the runner. The completion continuation
//! clears the flag and pumps again, so queued work drains in FIFO order with
//! at most one agent process alive at any instant. The run itself is a
//! nested task, so a panic inside the runner is logged and counted as a
//! finished run.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{error, info, info_span, Instrument};

use crate::models::task::TaskItem;
use crate::orchestrator::runner::AgentRunner;
use crate::util::truncate_text;

use super::queue::TaskQueue;

/// Instruction preview length in log lines.
const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Default)]
struct DispatchState {
    queue: TaskQueue,
    processing: bool,
    completed: u64,
}

struct Inner {
    runner: Arc<dyn AgentRunner>,
    state: Mutex<DispatchState>,
    idle: Notify,
}

/// Cloneable handle to the dispatch loop.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Create a dispatcher that executes tasks with `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn AgentRunner>) -> Self {
        Self {
            inner: Arc::new(Inner {
                runner,
                state: Mutex::new(DispatchState::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Queue `task` and start it if the agent is idle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, task: TaskItem) {
        self.lock().queue.push(task);
        self.pump();
    }

    /// Number of tasks waiting behind the in-flight one.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Whether an agent run is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    /// Number of runs that have finished, successfully or not.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.lock().completed
    }

    /// Wait until the queue is empty and no run is in flight.
    pub async fn drained(&self) {
        loop {
            let notified = self.inner.idle.notified();
            {
                let state = self.lock();
                if !state.processing && state.queue.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn pump(&self) {
        let task = {
            let mut state = self.lock();
            if state.processing {
                return;
            }
            let Some(task) = state.queue.pop() else {
                return;
            };
            state.processing = true;
            task
        };

        let this = self.clone();
        let runner = Arc::clone(&self.inner.runner);
        let span = info_span!("dispatch", message_id = task.id);
        let run_span = span.clone();
        tokio::spawn(
            async move {
                info!(
                    instruction = %truncate_text(&task.text, PREVIEW_CHARS),
                    "processing instruction"
                );
                // A panicking runner must still release the processing flag.
                let run = tokio::spawn(async move { runner.run(task).await }.instrument(run_span));
                match run.await {
                    Ok(Ok(code)) => info!(exit_code = code, "agent finished"),
                    Ok(Err(err)) => error!(%err, "agent run failed"),
                    Err(err) => error!(%err, "agent run aborted"),
                }
                this.finish();
            }
            .instrument(span),
        );
    }

    fn finish(&self) {
        {
            let mut state = self.lock();
            state.processing = false;
            state.completed += 1;
        }
        self.pump();
        self.inner.idle.notify_waiters();
    }
}
