//! Message source adapters.
//!
//! Both adapters yield chronological batches of trimmed, non-empty
//! [`ChatMessage`]s:
//!
//! - [`PollSource`] fetches the latest window on a fixed timer and reverses
//!   the service's newest-first order.
//! - [`StreamSource`] reads newline-delimited records written by the push
//!   listener process. Its first batch is empty: nothing from before the
//!   subscription is visible, so the tracker starts from cursor zero.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::process::Child;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use crate::connection::ChatConnection;
use crate::ipc::codec::RecordCodec;
use crate::ipc::record::MessageRecord;
use crate::models::message::ChatMessage;
use crate::Result;

/// Batch future returned by [`MessageSource::next_batch`].
pub type BatchFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Vec<ChatMessage>>>> + Send + 'a>>;

/// Uniform intake interface over pull and push delivery.
pub trait MessageSource: Send {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Wait for the next chronological batch.
    ///
    /// `Ok(None)` means the source is exhausted and will never yield again.
    /// `Err` is a transient failure; the caller may ask again.
    fn next_batch(&mut self) -> BatchFuture<'_>;
}

/// Keep trimmed, non-empty messages.
#[must_use]
pub fn normalize(messages: impl IntoIterator<Item = ChatMessage>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .filter_map(ChatMessage::normalized)
        .collect()
}

// ── Pull ─────────────────────────────────────────────────────────────────────

/// Timer-driven fetch of the most recent messages in one dialog.
pub struct PollSource {
    connection: Arc<dyn ChatConnection>,
    dialog_id: String,
    limit: u16,
    ticker: Interval,
}

impl PollSource {
    /// Create a poller. The first batch is fetched immediately.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        connection: Arc<dyn ChatConnection>,
        dialog_id: impl Into<String>,
        limit: u16,
        every: Duration,
    ) -> Self {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            connection,
            dialog_id: dialog_id.into(),
            limit,
            ticker,
        }
    }
}

impl MessageSource for PollSource {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn next_batch(&mut self) -> BatchFuture<'_> {
        Box::pin(async move {
            self.ticker.tick().await;
            let mut messages = self
                .connection
                .fetch_recent(&self.dialog_id, self.limit)
                .await?;
            messages.reverse();
            debug!(fetched = messages.len(), "fetched recent messages");
            Ok(Some(normalize(messages)))
        })
    }
}

// ── Push ─────────────────────────────────────────────────────────────────────

/// Reader over the push listener's record stream.
pub struct StreamSource<R> {
    frames: FramedRead<R, RecordCodec>,
    child: Option<Child>,
    primed: bool,
}

impl<R> StreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Read records from an arbitrary byte stream.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            frames: FramedRead::new(reader, RecordCodec::new()),
            child: None,
            primed: false,
        }
    }

    /// Read records from a listener process, keeping it alive for as long as
    /// the source lives.
    #[must_use]
    pub fn with_child(reader: R, child: Child) -> Self {
        Self {
            child: Some(child),
            ..Self::new(reader)
        }
    }

    async fn next_message(&mut self) -> Option<ChatMessage> {
        while let Some(frame) = self.frames.next().await {
            match frame {
                Ok(line) => {
                    if let Some(message) = MessageRecord::parse(&line)
                        .map(ChatMessage::from)
                        .and_then(ChatMessage::normalized)
                    {
                        return Some(message);
                    }
                }
                Err(err) => {
                    warn!(%err, "listener stream read failed");
                    break;
                }
            }
        }
        None
    }

    async fn reap(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.wait().await {
            Ok(status) => warn!(%status, "listener process exited"),
            Err(err) => warn!(%err, "failed to wait for listener process"),
        }
    }
}

impl<R> MessageSource for StreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn name(&self) -> &'static str {
        "stream"
    }

    fn next_batch(&mut self) -> BatchFuture<'_> {
        Box::pin(async move {
            if !self.primed {
                self.primed = true;
                return Ok(Some(Vec::new()));
            }
            if let Some(message) = self.next_message().await {
                return Ok(Some(vec![message]));
            }
            self.reap().await;
            Ok(None)
        })
    }
}
