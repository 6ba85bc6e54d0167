//! Agent process spawner.
//!
//! Builds the agent CLI command line for one instruction and spawns it
//! non-interactively in the workspace, with `kill_on_drop(true)` so an
//! interrupted relay never leaves an orphaned agent behind.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::info;

use crate::config::AgentConfig;
use crate::{AppError, Result};

/// `PATH` with `~/.local/bin` prepended, when that directory exists.
///
/// Returns `None` when nothing needs to change.
#[must_use]
pub fn agent_path_env() -> Option<OsString> {
    let home = std::env::var_os("HOME")?;
    let local_bin = PathBuf::from(home).join(".local").join("bin");
    if !local_bin.is_dir() {
        return None;
    }
    let mut paths = vec![local_bin];
    if let Some(current) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(paths).ok()
}

/// Full argument list for one agent run.
///
/// Order: configured args, optional `--model`, then `--workspace`,
/// `--resume`, and the prompt.
#[must_use]
pub fn agent_args(config: &AgentConfig, workspace: &Path, chat_id: &str, prompt: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = config.args.iter().map(OsString::from).collect();
    if let Some(model) = config.model.as_deref().filter(|m| !m.trim().is_empty()) {
        args.push("--model".into());
        args.push(model.into());
    }
    args.push("--workspace".into());
    args.push(workspace.as_os_str().to_owned());
    args.push("--resume".into());
    args.push(chat_id.into());
    args.push(prompt.into());
    args
}

/// Spawn the agent for one prompt with stdout and stderr piped.
///
/// # Errors
///
/// Returns `AppError::Agent` if the process fails to spawn.
pub fn spawn_agent(config: &AgentConfig, workspace: &Path, chat_id: &str, prompt: &str) -> Result<Child> {
    let mut cmd = Command::new(&config.program);
    cmd.args(agent_args(config, workspace, chat_id, prompt))
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(path) = agent_path_env() {
        cmd.env("PATH", path);
    }

    let child = cmd
        .spawn()
        .map_err(|err| AppError::Agent(format!("failed to spawn {}: {err}", config.program)))?;

    info!(
        pid = child.id().unwrap_or(0),
        program = %config.program,
        "agent process spawned"
    );
    Ok(child)
}
