//! Push listener process plumbing.
//!
//! The dispatcher runs the push subscription in a child process
//! (`agent-relay listen`) so the subscription's client session never shares
//! state with the pull client. The child writes one [`MessageRecord`] per
//! line on stdout; the parent reads that pipe through a
//! [`StreamSource`](crate::pipeline::source::StreamSource).

use std::path::Path;
use std::process::Stdio;

use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info};

use super::codec::RecordCodec;
use super::record::MessageRecord;
use crate::models::message::ChatMessage;
use crate::{AppError, Result};

/// Hidden subcommand the listener child runs.
pub const LISTEN_SUBCOMMAND: &str = "listen";

/// Spawn the listener child for `dialog_id` using the current executable.
///
/// stdout is piped for records; stderr is inherited so the child's logs land
/// on the parent's console.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the executable path cannot be resolved or the
/// child fails to start.
pub fn spawn_listener(dialog_id: &str, config_path: Option<&Path>) -> Result<(Child, ChildStdout)> {
    let exe = std::env::current_exe()
        .map_err(|err| AppError::Ipc(format!("cannot resolve current executable: {err}")))?;

    let mut cmd = Command::new(exe);
    if let Some(path) = config_path {
        cmd.arg("--config").arg(path);
    }
    cmd.arg(LISTEN_SUBCOMMAND)
        .arg("--dialog")
        .arg(dialog_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|err| AppError::Ipc(format!("failed to spawn listener: {err}")))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Ipc("listener stdout unavailable".into()))?;

    info!(pid = child.id(), dialog_id, "push listener started");
    Ok((child, stdout))
}

/// Write every message received on `rx` to `writer` as one record per line.
///
/// Returns once all senders are dropped.
///
/// # Errors
///
/// Returns `AppError::Ipc` if a record cannot be serialized or `AppError::Io`
/// if the writer is closed.
pub async fn forward_records<W>(mut rx: mpsc::Receiver<ChatMessage>, writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, RecordCodec::new());
    while let Some(message) = rx.recv().await {
        let line = MessageRecord::from(&message)
            .to_line()
            .map_err(|err| AppError::Ipc(format!("failed to encode record: {err}")))?;
        sink.send(line).await?;
        debug!(id = message.id, "forwarded pushed message");
    }
    Ok(())
}
