//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    BackgroundSyncParams, InterceptParams,
    cache::{CacheGetParams, generations_impl, get_impl},
    intercept::intercept_impl,
    lifecycle::{activate_impl, install_impl},
    sync::sync_impl,
};

use holdfast_client::Engine;
use holdfast_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for holdfast.
#[derive(Clone)]
pub struct HoldfastServer {
    engine: Arc<Engine>,
    db: CacheDb,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl HoldfastServer {
    /// Create a new server handler around a started engine.
    pub fn new(engine: Arc<Engine>, db: CacheDb) -> Self {
        Self { engine, db, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Run a request through the offline-first engine. Returns status, headers, body, routing class and whether the answer came from the network, the store or an offline placeholder."
    )]
    async fn intercept(&self, params: Parameters<InterceptParams>) -> Result<CallToolResult, McpError> {
        intercept_impl(&self.engine, params.0).await
    }

    #[tool(description = "Fetch every configured static asset into a new store generation for this version.")]
    async fn lifecycle_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.engine).await
    }

    #[tool(description = "Make this version's installed generation current and delete every other generation.")]
    async fn lifecycle_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.engine).await
    }

    #[tool(description = "Read a stored snapshot from the current generation by fingerprint or URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, params.0).await
    }

    #[tool(description = "List store generations with their state and the generation currently serving.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.engine, &self.db).await
    }

    #[tool(description = "Deliver a background-sync signal to the outbound request queue.")]
    async fn background_sync(&self, params: Parameters<BackgroundSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for HoldfastServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "holdfast".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
