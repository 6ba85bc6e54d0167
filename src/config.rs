//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::mode::{SourceMode, TransportMode};
use crate::{AppError, Result};

/// Keychain service name under which Slack tokens are stored.
pub const KEYRING_SERVICE: &str = "agent-relay";

/// Keychain entry holding the Slack bot token.
pub const BOT_TOKEN_KEY: &str = "slack_bot_token";

/// Keychain entry holding the Slack app-level token.
pub const APP_TOKEN_KEY: &str = "slack_app_token";

/// Slack connectivity settings.
///
/// Tokens are loaded at runtime via OS keychain or environment variables,
/// never from the TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// Dialog (channel) the pipeline watches and the MCP resource exposes.
    #[serde(default)]
    pub channel_id: String,
    /// App-level token used for Socket Mode (populated at runtime).
    #[serde(skip)]
    pub app_token: String,
    /// Bot user token used for Web API calls (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

/// Message intake settings for the dispatch pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PollConfig {
    /// Pull or push intake.
    #[serde(default)]
    pub mode: SourceMode,
    /// Seconds between fetch ticks in pull mode.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Number of most recent messages fetched per tick.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u16,
    /// Maximum number of enqueued ids remembered for duplicate detection.
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            interval_seconds: default_interval_seconds(),
            fetch_limit: default_fetch_limit(),
            seen_capacity: default_seen_capacity(),
        }
    }
}

impl PollConfig {
    /// Fetch interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// External coding-agent command line.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Agent CLI binary.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before `--workspace`, `--resume`, and the prompt.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Arguments that make the agent CLI print a new conversation id.
    #[serde(default = "default_create_chat_args")]
    pub create_chat_args: Vec<String>,
    /// Optional model name passed as `--model`.
    #[serde(default)]
    pub model: Option<String>,
    /// File (relative to the workspace) holding the shared conversation id.
    #[serde(default = "default_chat_file")]
    pub chat_file: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            create_chat_args: default_create_chat_args(),
            model: None,
            chat_file: default_chat_file(),
        }
    }
}

/// MCP server settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Transport used by `agent-relay mcp`.
    #[serde(default)]
    pub transport: TransportMode,
    /// HTTP port for the streamable HTTP transport.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Path segment the HTTP transport is mounted on.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            http_port: default_http_port(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_interval_seconds() -> u64 {
    3
}

fn default_fetch_limit() -> u16 {
    20
}

fn default_seen_capacity() -> usize {
    1024
}

fn default_program() -> String {
    "cursor".into()
}

fn default_args() -> Vec<String> {
    ["agent", "--print", "--approve-mcps", "--force", "--sandbox", "disabled"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

fn default_create_chat_args() -> Vec<String> {
    vec!["agent".into(), "create-chat".into()]
}

fn default_chat_file() -> PathBuf {
    PathBuf::from(".vibe-agent-chat")
}

fn default_http_port() -> u16 {
    3000
}

fn default_endpoint() -> String {
    "mcp".into()
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

/// Global configuration parsed from an optional `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Workspace directory the agent operates in.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    /// Slack connectivity settings.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Pipeline intake settings.
    #[serde(default)]
    pub poll: PollConfig,
    /// Agent command line.
    #[serde(default)]
    pub agent: AgentConfig,
    /// MCP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            slack: SlackConfig::default(),
            poll: PollConfig::default(),
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load configuration from `path`, or fall back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Canonicalize the workspace path in place.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the workspace does not exist.
    pub fn resolve_workspace(&mut self) -> Result<()> {
        self.workspace = self
            .workspace
            .canonicalize()
            .map_err(|err| AppError::Config(format!("workspace invalid: {err}")))?;
        Ok(())
    }

    /// Absolute path of the persisted shared chat handle.
    #[must_use]
    pub fn chat_file_path(&self) -> PathBuf {
        self.workspace.join(&self.agent.chat_file)
    }

    /// The watched dialog id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when no dialog is configured.
    pub fn dialog_id(&self) -> Result<&str> {
        if self.slack.channel_id.trim().is_empty() {
            return Err(AppError::Config(
                "no dialog configured: pass --dialog or set slack.channel_id".into(),
            ));
        }
        Ok(self.slack.channel_id.trim())
    }

    /// Load the Slack bot token from OS keychain with env-var fallback.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides the token.
    pub async fn load_bot_token(&mut self) -> Result<()> {
        self.slack.bot_token = load_credential(BOT_TOKEN_KEY, "SLACK_BOT_TOKEN").await?;
        Ok(())
    }

    /// Load the Slack app-level token (Socket Mode) from OS keychain with
    /// env-var fallback.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides the token.
    pub async fn load_app_token(&mut self) -> Result<()> {
        self.slack.app_token = load_credential(APP_TOKEN_KEY, "SLACK_APP_TOKEN").await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.poll.interval_seconds == 0 {
            return Err(AppError::Config(
                "poll.interval_seconds must be greater than zero".into(),
            ));
        }

        if self.poll.fetch_limit == 0 || self.poll.fetch_limit > 100 {
            return Err(AppError::Config(
                "poll.fetch_limit must be between 1 and 100".into(),
            ));
        }

        if self.poll.seen_capacity == 0 {
            return Err(AppError::Config(
                "poll.seen_capacity must be greater than zero".into(),
            ));
        }

        if self.agent.program.trim().is_empty() {
            return Err(AppError::Config("agent.program must not be empty".into()));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(keyring::Error::NoEntry) => {}
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}

/// Save `value` in the OS keychain under `keyring_key`.
///
/// # Errors
///
/// Returns `AppError::Config` if the value is blank or the keychain rejects
/// the write.
pub async fn store_credential(keyring_key: &str, value: &str) -> Result<()> {
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(AppError::Config(format!("{keyring_key} must not be empty")));
    }
    let key = keyring_key.to_owned();

    tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.set_password(&value))
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?
    .map_err(|err| AppError::Config(format!("failed to store {keyring_key}: {err}")))
}

/// Remove `keyring_key` from the OS keychain.
///
/// Returns `false` when there was nothing to remove.
///
/// # Errors
///
/// Returns `AppError::Config` if the keychain rejects the removal.
pub async fn delete_credential(keyring_key: &str) -> Result<bool> {
    let key = keyring_key.to_owned();

    let result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.delete_credential())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match result {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(AppError::Config(format!(
            "failed to remove {keyring_key}: {err}"
        ))),
    }
}
