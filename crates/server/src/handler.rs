//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use std::sync::Arc;

use crate::tools::{SwFetchParams, SwPostMessageParams, fetch_impl, post_message_impl, status_impl};

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
use swcache_client::ServiceWorker;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: Arc<ServiceWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a shared worker.
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Run a request through the worker.
    #[tool(
        description = "Fetch a URL through the offline caching worker. Relative URLs resolve against the worker origin. Returns status, headers, body and the strategy class used."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// Post a control message.
    #[tool(
        description = "Post a control message to the worker: SKIP_WAITING, CLEAR_CACHE (replies {success}) or GET_CACHE_SIZE (replies {size})."
    )]
    async fn sw_post_message(&self, params: Parameters<SwPostMessageParams>) -> Result<CallToolResult, McpError> {
        post_message_impl(&self.worker, params.0).await
    }

    /// Report lifecycle state and store contents.
    #[tool(description = "Report the worker lifecycle state, current store names and per-store entry counts and sizes.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::worker;

    #[tokio::test]
    async fn test_router_lists_every_tool() {
        let (worker, _network) = worker().await;
        let server = SwCacheServer::new(Arc::new(worker));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["sw_fetch", "sw_post_message", "sw_status"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, _network) = worker().await;
        let info = SwCacheServer::new(Arc::new(worker)).get_info();
        assert_eq!(info.server_info.name, "swcache");
    }
}
