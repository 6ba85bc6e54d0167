//! Persistent agent conversation handle.
//!
//! Every agent run resumes the same conversation so context carries across
//! instructions. The handle is stored as a single trimmed line in a file
//! inside the workspace; it is created by the agent CLI on first use.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use super::spawner::agent_path_env;
use crate::config::AgentConfig;
use crate::{AppError, Result};

/// File-backed store for the shared chat handle.
#[derive(Debug, Clone)]
pub struct ChatHandleStore {
    path: PathBuf,
}

impl ChatHandleStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted handle, if the file exists and is non-empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file exists but cannot be read.
    pub async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let handle = raw.trim();
                Ok((!handle.is_empty()).then(|| handle.to_owned()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::Io(format!(
                "failed to read chat handle {}: {err}",
                self.path.display()
            ))),
        }
    }

    /// Return the persisted handle, or run `create` and persist its result.
    ///
    /// An existing handle is reused as-is, without checking that the agent
    /// still knows it.
    ///
    /// # Errors
    ///
    /// Propagates the creator's error, or `AppError::Io` if the handle
    /// cannot be read or written.
    pub async fn get_or_create<F, Fut>(&self, create: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(handle) = self.load().await? {
            info!(path = %self.path.display(), "reusing agent chat");
            return Ok(handle);
        }

        let handle = create().await?;
        let handle = handle.trim().to_owned();
        if handle.is_empty() {
            return Err(AppError::Agent("agent returned an empty chat id".into()));
        }
        tokio::fs::write(&self.path, &handle).await.map_err(|err| {
            AppError::Io(format!(
                "failed to write chat handle {}: {err}",
                self.path.display()
            ))
        })?;
        info!(path = %self.path.display(), "created agent chat");
        Ok(handle)
    }
}

/// Ask the agent CLI for a new conversation and return its id.
///
/// # Errors
///
/// Returns `AppError::Agent` if the command cannot run or exits non-zero.
pub async fn create_chat(config: &AgentConfig, workspace: &Path) -> Result<String> {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.create_chat_args)
        .current_dir(workspace)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(path) = agent_path_env() {
        cmd.env("PATH", path);
    }

    let output = cmd
        .output()
        .await
        .map_err(|err| AppError::Agent(format!("failed to run {}: {err}", config.program)))?;
    if !output.status.success() {
        return Err(AppError::Agent(format!(
            "create-chat failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}
