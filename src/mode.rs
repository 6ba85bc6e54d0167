//! Runtime mode selectors shared by the CLI and the TOML config.
//!
//! [`SourceMode`] picks how the dispatch pipeline receives chat messages;
//! [`TransportMode`] picks how the MCP chat tools are served.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the dispatch pipeline ingests new chat messages.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Fetch the latest window of messages on a fixed timer. Default mode.
    #[default]
    Pull,
    /// Subscribe to new-message events in an isolated listener process.
    Push,
}

/// Transport used to serve the MCP chat tools.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// JSON-RPC over stdin/stdout. Default transport.
    #[default]
    Stdio,
    /// Streamable HTTP on `server.http_port`.
    Http,
}
