#![forbid(unsafe_code)]

//! `agent-relay` binary.
//!
//! Runs the chat-to-agent dispatch pipeline, the push listener child, the
//! MCP chat tools server, one-shot chat commands, and keychain login.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use agent_relay::config::{
    delete_credential, store_credential, GlobalConfig, APP_TOKEN_KEY, BOT_TOKEN_KEY,
};
use agent_relay::connection::ChatConnection;
use agent_relay::digest::{render_digest, write_digest};
use agent_relay::ipc::listener::{forward_records, spawn_listener};
use agent_relay::mcp::handler::AppState;
use agent_relay::mcp::{http, transport};
use agent_relay::mode::{SourceMode, TransportMode};
use agent_relay::orchestrator::chat_handle::{create_chat, ChatHandleStore};
use agent_relay::orchestrator::runner::CliAgentRunner;
use agent_relay::pipeline::dispatcher::Dispatcher;
use agent_relay::pipeline::source::{normalize, MessageSource, PollSource, StreamSource};
use agent_relay::pipeline::tracker::DedupTracker;
use agent_relay::slack::client::{shared_connection, SlackService};
use agent_relay::slack::events::run_push_listener;
use agent_relay::{pipeline, AppError, Result};

const LISTENER_QUEUE: usize = 256;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "agent-relay",
    about = "Relay chat instructions to a coding agent and serve chat tools over MCP",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch a dialog and run the agent once per new instruction.
    Agent(AgentArgs),
    /// Push listener child process; writes records to stdout.
    #[command(hide = true)]
    Listen {
        /// Dialog to subscribe to.
        #[arg(short, long)]
        dialog: String,
    },
    /// Serve the chat tools over MCP.
    Mcp {
        /// Transport to serve on.
        #[arg(short, long, value_enum)]
        transport: Option<TransportMode>,
        /// HTTP port (http transport only).
        #[arg(short, long)]
        port: Option<u16>,
        /// HTTP path segment (http transport only).
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Continuously write a markdown digest of a dialog to a file.
    Poll {
        /// Dialog to read.
        #[arg(short, long)]
        dialog: Option<String>,
        /// Output file.
        #[arg(short, long, default_value = ".vibe-instructions.md")]
        output: PathBuf,
        /// Seconds between refreshes.
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
    },
    /// Send one message to a dialog.
    Send {
        /// Target dialog.
        #[arg(short, long)]
        dialog: String,
        /// Message text.
        #[arg(short, long)]
        message: String,
    },
    /// Create a group dialog for instructions.
    CreateGroup {
        /// Group title.
        #[arg(default_value = "Cursor Instructions")]
        title: String,
        /// Group description.
        #[arg(long)]
        about: Option<String>,
    },
    /// List dialogs visible to the bot.
    ListDialogs {
        /// Maximum number of dialogs.
        #[arg(long, default_value_t = 100)]
        limit: u16,
    },
    /// Verify Slack tokens and save them in the OS keychain.
    Login {
        /// Bot user token (`xoxb-...`); prompted for when omitted.
        #[arg(long)]
        bot_token: Option<String>,
        /// App-level token (`xapp-...`) for push mode.
        #[arg(long)]
        app_token: Option<String>,
    },
    /// Remove saved Slack tokens from the OS keychain.
    Logout,
}

#[derive(Debug, Args)]
struct AgentArgs {
    /// Dialog to watch.
    #[arg(short, long)]
    dialog: Option<String>,
    /// Workspace the agent operates in.
    #[arg(short, long)]
    workspace: Option<PathBuf>,
    /// File holding the shared agent chat id, relative to the workspace.
    #[arg(long)]
    chat_file: Option<PathBuf>,
    /// Seconds between fetches in pull mode.
    #[arg(short, long)]
    interval: Option<u64>,
    /// Receive messages through a push subscription instead of polling.
    #[arg(long)]
    push: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = GlobalConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Agent(agent) => run_agent(config, agent, args.config).await,
        Command::Listen { dialog } => run_listen(config, &dialog).await,
        Command::Mcp {
            transport,
            port,
            endpoint,
        } => run_mcp(config, transport, port, endpoint).await,
        Command::Poll {
            dialog,
            output,
            interval,
        } => run_poll(config, dialog, output, interval).await,
        Command::Send { dialog, message } => {
            let service = connect(config).await?;
            service.send_message(&dialog, &message).await?;
            println!("Sent to {dialog}");
            Ok(())
        }
        Command::CreateGroup { title, about } => {
            let service = connect(config).await?;
            let dialog = service.create_group(&title, about.as_deref()).await?;
            println!("Created \"{}\" with dialog id {}", dialog.name, dialog.id);
            Ok(())
        }
        Command::Login {
            bot_token,
            app_token,
        } => run_login(config, bot_token, app_token).await,
        Command::Logout => {
            for key in [BOT_TOKEN_KEY, APP_TOKEN_KEY] {
                if delete_credential(key).await? {
                    println!("Removed {key}");
                }
            }
            println!("Logged out");
            Ok(())
        }
        Command::ListDialogs { limit } => {
            let service = connect(config).await?;
            for dialog in service.list_dialogs(limit).await? {
                println!("{}\t{}", dialog.id, dialog.name);
            }
            Ok(())
        }
    }
}

async fn connect(mut config: GlobalConfig) -> Result<SlackService> {
    config.load_bot_token().await?;
    SlackService::connect(&config.slack).await
}

async fn run_login(
    mut config: GlobalConfig,
    bot_token: Option<String>,
    app_token: Option<String>,
) -> Result<()> {
    let bot_token = match bot_token {
        Some(token) => token,
        None => prompt_line("Slack bot token: ").await?,
    };
    config.slack.bot_token = bot_token.trim().to_owned();
    SlackService::connect(&config.slack).await?;
    store_credential(BOT_TOKEN_KEY, &config.slack.bot_token).await?;
    println!("Saved {BOT_TOKEN_KEY}");

    if let Some(app_token) = app_token {
        store_credential(APP_TOKEN_KEY, &app_token).await?;
        println!("Saved {APP_TOKEN_KEY}");
    }
    Ok(())
}

async fn prompt_line(label: &str) -> Result<String> {
    eprint!("{label}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines
        .next_line()
        .await?
        .ok_or_else(|| AppError::Config("no input on stdin".into()))
}

async fn run_agent(
    mut config: GlobalConfig,
    args: AgentArgs,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(dialog) = args.dialog {
        config.slack.channel_id = dialog;
    }
    if let Some(workspace) = args.workspace {
        config.workspace = workspace;
    }
    if let Some(chat_file) = args.chat_file {
        config.agent.chat_file = chat_file;
    }
    if let Some(interval) = args.interval {
        if interval == 0 {
            return Err(AppError::Config("--interval must be greater than zero".into()));
        }
        config.poll.interval_seconds = interval;
    }
    if args.push {
        config.poll.mode = SourceMode::Push;
    }

    config.resolve_workspace()?;
    let dialog_id = config.dialog_id()?.to_owned();
    config.load_bot_token().await?;
    if config.poll.mode == SourceMode::Push {
        config.load_app_token().await?;
    }

    let store = ChatHandleStore::new(config.chat_file_path());
    let chat_id = store
        .get_or_create(|| create_chat(&config.agent, &config.workspace))
        .await?;

    info!(
        workspace = %config.workspace.display(),
        chat_id,
        dialog_id,
        mode = ?config.poll.mode,
        "agent relay starting"
    );

    let runner = CliAgentRunner::new(
        config.agent.clone(),
        config.workspace.clone(),
        chat_id,
        dialog_id.clone(),
    );
    let dispatcher = Dispatcher::new(Arc::new(runner));
    let tracker = DedupTracker::new(config.poll.seen_capacity);

    match config.poll.mode {
        SourceMode::Pull => {
            let service = SlackService::connect(&config.slack).await?;
            let source = PollSource::new(
                Arc::new(service),
                dialog_id,
                config.poll.fetch_limit,
                config.poll.interval(),
            );
            run_until_shutdown(source, tracker, dispatcher).await
        }
        SourceMode::Push => {
            let (child, stdout) = spawn_listener(&dialog_id, config_path.as_deref())?;
            let source = StreamSource::with_child(stdout, child);
            run_until_shutdown(source, tracker, dispatcher).await
        }
    }
}

async fn run_until_shutdown<S: MessageSource>(
    source: S,
    tracker: DedupTracker,
    dispatcher: Dispatcher,
) -> Result<()> {
    tokio::select! {
        result = pipeline::run(source, tracker, dispatcher) => {
            if let Err(ref err) = result {
                error!(%err, "dispatch pipeline stopped");
            }
            result
        }
        () = shutdown_signal() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

async fn run_listen(mut config: GlobalConfig, dialog_id: &str) -> Result<()> {
    config.load_app_token().await?;

    let (tx, rx) = mpsc::channel(LISTENER_QUEUE);
    tokio::select! {
        result = run_push_listener(&config.slack, dialog_id, tx) => result,
        result = forward_records(rx, tokio::io::stdout()) => result,
        () = shutdown_signal() => Ok(()),
    }
}

async fn run_mcp(
    mut config: GlobalConfig,
    transport_override: Option<TransportMode>,
    port: Option<u16>,
    endpoint: Option<String>,
) -> Result<()> {
    if let Some(mode) = transport_override {
        config.server.transport = mode;
    }
    if let Some(port) = port {
        config.server.http_port = port;
    }
    if let Some(endpoint) = endpoint {
        config.server.endpoint = endpoint;
    }
    config.load_bot_token().await?;

    let connection = Arc::new(shared_connection(config.slack.clone()));
    let config = Arc::new(config);
    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        connection,
    });

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_ct.cancel();
    });

    match config.server.transport {
        TransportMode::Stdio => transport::serve_stdio(state, ct).await,
        TransportMode::Http => {
            http::serve_http(state, config.server.http_port, &config.server.endpoint, ct).await
        }
    }
}

async fn run_poll(
    mut config: GlobalConfig,
    dialog: Option<String>,
    output: PathBuf,
    interval: u64,
) -> Result<()> {
    if interval == 0 {
        return Err(AppError::Config("--interval must be greater than zero".into()));
    }
    if let Some(dialog) = dialog {
        config.slack.channel_id = dialog;
    }
    let dialog_id = config.dialog_id()?.to_owned();
    let limit = config.poll.fetch_limit;
    let service = connect(config).await?;

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
    info!(dialog_id, output = %output.display(), interval, "writing digest");
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = shutdown_signal() => {
                println!();
                return Ok(());
            }
        }

        let outcome = async {
            let mut messages = service.fetch_recent(&dialog_id, limit).await?;
            messages.reverse();
            let messages = normalize(messages);
            write_digest(&output, &render_digest(&dialog_id, &messages, Utc::now())).await?;
            Ok::<_, AppError>(messages.len())
        }
        .await;

        match outcome {
            Ok(count) => print!("\r✓ Updated {} ({count} messages)", output.display()),
            Err(err) => {
                warn!(%err, "digest refresh failed");
                print!("\r✗ Error: {err}");
            }
        }
        if let Err(err) = std::io::stdout().flush() {
            warn!(%err, "failed to flush status line");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

/// Logs always go to stderr; stdout carries MCP frames, listener records,
/// and relayed agent output.
fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
