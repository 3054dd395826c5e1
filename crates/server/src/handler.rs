//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use charter_core::{Reader, Registration};
use url::Url;

use crate::tools::{CacheControlParams, CacheFetchParams, DocumentGetParams, DocumentSearchParams, cache, document};

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

/// The main MCP server handler for charter.
#[derive(Clone)]
pub struct CharterServer {
    reader: Arc<Reader>,
    registration: Arc<Registration>,
    origin: Url,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CharterServer {
    /// Create a new server handler.
    pub fn new(reader: Arc<Reader>, registration: Arc<Registration>, origin: Url) -> Self {
        Self { reader, registration, origin, tool_router: Self::tool_router() }
    }

    #[tool(description = "Search the constitution. Returns ranked hits with highlighted titles and excerpts.")]
    async fn document_search(&self, params: Parameters<DocumentSearchParams>) -> Result<CallToolResult, McpError> {
        document::search_impl(&self.reader, params.0).await
    }

    #[tool(description = "Get the preamble, an article or an amendment by anchor id (e.g. article-1, amendment-14).")]
    async fn document_get(&self, params: Parameters<DocumentGetParams>) -> Result<CallToolResult, McpError> {
        document::get_impl(&self.reader, params.0).await
    }

    /// Fetch through the offline worker.
    ///
    /// Served from the cache when possible, from the network otherwise, and
    /// from the offline fallbacks when both fail.
    #[tool(description = "Fetch a site resource through the offline cache. Reports whether cache, network or an offline fallback answered.")]
    async fn cache_fetch(&self, params: Parameters<CacheFetchParams>) -> Result<CallToolResult, McpError> {
        cache::fetch_impl(&self.registration, &self.origin, params.0).await
    }

    #[tool(description = "Send a control message to the offline worker: SKIP_WAITING, GET_CACHE_STATUS or CLEAR_CACHE.")]
    async fn cache_control(&self, params: Parameters<CacheControlParams>) -> Result<CallToolResult, McpError> {
        cache::control_impl(&self.registration, params.0).await
    }
}

impl ServerHandler for CharterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "charter".into(),
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
