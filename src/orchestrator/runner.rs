//! Agent runner: one supervised agent process per instruction.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::io::{self, AsyncRead, AsyncWrite};
use tracing::{info_span, warn, Instrument};

use super::prompt::build_prompt;
use super::spawner::spawn_agent;
use crate::config::AgentConfig;
use crate::models::task::TaskItem;
use crate::{AppError, Result};

/// Future resolving to the agent's exit code.
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>>;

/// Executes one task to completion.
///
/// Implementations resolve with the process exit code. A non-zero code is a
/// normal outcome, not an error; `Err` means the agent could not be run.
pub trait AgentRunner: Send + Sync {
    /// Run `task` and wait for it to finish.
    fn run(&self, task: TaskItem) -> RunFuture<'_>;
}

/// Runs the configured agent CLI, resuming one shared conversation.
#[derive(Debug, Clone)]
pub struct CliAgentRunner {
    config: AgentConfig,
    workspace: PathBuf,
    chat_id: String,
    dialog_id: String,
}

impl CliAgentRunner {
    /// Create a runner bound to a workspace, conversation, and dialog.
    #[must_use]
    pub fn new(
        config: AgentConfig,
        workspace: impl Into<PathBuf>,
        chat_id: impl Into<String>,
        dialog_id: impl Into<String>,
    ) -> Self {
        Self {
            config,
            workspace: workspace.into(),
            chat_id: chat_id.into(),
            dialog_id: dialog_id.into(),
        }
    }

    async fn execute(&self, task: TaskItem) -> Result<i32> {
        let prompt = build_prompt(&task.text, &self.dialog_id);
        let mut child = spawn_agent(&self.config, &self.workspace, &self.chat_id, &prompt)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, (), ()) = tokio::join!(
            child.wait(),
            relay(stdout, io::stdout()),
            relay(stderr, io::stderr()),
        );

        let status = status
            .map_err(|err| AppError::Agent(format!("failed to wait for agent: {err}")))?;
        // Killed by a signal: no code to report.
        Ok(status.code().unwrap_or(0))
    }
}

impl AgentRunner for CliAgentRunner {
    fn run(&self, task: TaskItem) -> RunFuture<'_> {
        let span = info_span!("agent_run", message_id = task.id);
        Box::pin(self.execute(task).instrument(span))
    }
}

async fn relay<R, W>(from: Option<R>, mut to: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(mut from) = from else {
        return;
    };
    if let Err(err) = io::copy(&mut from, &mut to).await {
        warn!(%err, "agent output relay stopped");
    }
}
