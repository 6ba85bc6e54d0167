//! MCP server handler and shared application state.

use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListResourcesResult, ListToolsResult,
    PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use tracing::{info_span, Instrument};

use crate::config::GlobalConfig;
use crate::connection::SharedConnection;

use super::resources::dialog;
use super::tools;
use super::tools::util::to_mcp_error;

/// Shared application state accessible by all MCP tool handlers.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Lazily established chat connection.
    pub connection: Arc<SharedConnection>,
}

impl AppState {
    /// Configured dialog, if any.
    #[must_use]
    pub fn dialog_id(&self) -> Option<&str> {
        Some(self.config.slack.channel_id.trim()).filter(|id| !id.is_empty())
    }
}

/// MCP server exposing the chat tools.
#[derive(Clone)]
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    /// Create a new MCP server bound to shared application state.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl ServerHandler for RelayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Chat tools: list_dialogs, list_messages, send_message, create_group. \
                 Prefix status reports with [bot]."
                    .into(),
            ),
            ..Default::default()
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, rmcp::ErrorData>> + Send + '_ {
        let span = info_span!("call_tool", tool = %request.name);
        async move {
            tools::dispatch(&self.state, &request.name, request.arguments).await
        }
        .instrument(span)
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, rmcp::ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(tools::all_tools())))
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListResourcesResult, rmcp::ErrorData>> + Send + '_ {
        std::future::ready(Ok(dialog::list_resources(self.state.dialog_id())))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ReadResourceResult, rmcp::ErrorData>> + Send + '_ {
        async move {
            dialog::read_resource(&request.uri, &self.state)
                .await
                .map_err(|err| to_mcp_error(&err))
        }
    }
}
