//! Message-to-task dispatch pipeline.
//!
//! Chat messages flow through a [`source::MessageSource`], are classified by
//! the [`filter`], deduplicated by the [`tracker::DedupTracker`], and queued
//! on the [`dispatcher::Dispatcher`], which runs at most one agent at a time.

pub mod dispatcher;
pub mod filter;
pub mod queue;
pub mod source;
pub mod tracker;

use tracing::{info, info_span, warn, Instrument};

use crate::models::message::ChatMessage;
use crate::{AppError, Result};

use self::dispatcher::Dispatcher;
use self::source::MessageSource;
use self::tracker::DedupTracker;

/// Drive `source` forever, turning every new human message into a task.
///
/// Transient source errors are logged and the next batch is awaited; the
/// cursor is left untouched. The function only returns when the source is
/// exhausted, which is fatal for the pipeline.
///
/// # Errors
///
/// Returns `AppError::Ipc` when the source reports that it has closed.
pub async fn run<S>(mut source: S, mut tracker: DedupTracker, dispatcher: Dispatcher) -> Result<()>
where
    S: MessageSource,
{
    loop {
        let span = info_span!("fetch_tick", source = source.name());
        let batch = source.next_batch().instrument(span.clone()).await;
        span.in_scope(|| apply_batch(source.name(), batch, &mut tracker, &dispatcher))?;
    }
}

fn apply_batch(
    name: &str,
    batch: Result<Option<Vec<ChatMessage>>>,
    tracker: &mut DedupTracker,
    dispatcher: &Dispatcher,
) -> Result<()> {
    match batch {
        Ok(Some(messages)) => {
            let was_initialized = tracker.is_initialized();
            let tasks = tracker.observe(&messages);
            if !was_initialized {
                info!(
                    cursor = tracker.last_processed_id(),
                    visible = messages.len(),
                    "cursor initialized; existing messages will not be replayed"
                );
            }
            for task in tasks {
                info!(message_id = task.id, "instruction enqueued");
                dispatcher.enqueue(task);
            }
            Ok(())
        }
        Ok(None) => {
            warn!("message source closed");
            Err(AppError::Ipc(format!("{name} message source closed")))
        }
        Err(err) => {
            warn!(%err, "fetch failed; retrying on next tick");
            Ok(())
        }
    }
}
