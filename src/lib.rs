#![forbid(unsafe_code)]

//! `agent-relay`: relays chat instructions to a coding-agent CLI and serves
//! chat tools over MCP.

pub mod config;
pub mod connection;
pub mod digest;
pub mod errors;
pub mod ipc;
pub mod mcp;
pub mod mode;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod slack;
pub mod util;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
