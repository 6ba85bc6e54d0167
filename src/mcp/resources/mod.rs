//! MCP resources.

pub mod dialog;
