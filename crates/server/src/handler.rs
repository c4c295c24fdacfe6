//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

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
use sslwatch_core::{AppConfig, Reconciler};

use crate::tools::domain::{
    DomainDeleteParams, DomainGetParams, DomainListParams, DomainObserveParams, delete_impl, get_impl, list_impl,
    observe_impl, recent_impl,
};

/// The main MCP server handler for sslwatch.
#[derive(Clone)]
pub struct SslWatchServer {
    reconciler: Reconciler,
    config: Arc<AppConfig>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SslWatchServer {
    /// Create a new server handler.
    pub fn new(reconciler: Reconciler, config: AppConfig) -> Self {
        Self { reconciler, config: Arc::new(config), tool_router: Self::tool_router() }
    }

    /// Store a scanned domain and reconcile it against earlier observations.
    #[tool(
        description = "Record a scanned domain with its servers. Returns the stored domain with its grade, previous grade and whether its servers changed."
    )]
    async fn domain_observe(&self, params: Parameters<DomainObserveParams>) -> Result<CallToolResult, McpError> {
        observe_impl(&self.reconciler, &self.config, params.0).await
    }

    #[tool(description = "List the most recent observation of every domain name seen by this process.")]
    async fn domain_recent(&self) -> Result<CallToolResult, McpError> {
        recent_impl(&self.reconciler).await
    }

    #[tool(description = "List stored domains with limit/offset pagination.")]
    async fn domain_list(&self, params: Parameters<DomainListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.reconciler, &self.config, params.0).await
    }

    #[tool(description = "Get one stored domain with its servers by id.")]
    async fn domain_get(&self, params: Parameters<DomainGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.reconciler, &self.config, params.0).await
    }

    #[tool(description = "Delete a stored domain and its servers by id.")]
    async fn domain_delete(&self, params: Parameters<DomainDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.reconciler, &self.config, params.0).await
    }
}

impl ServerHandler for SslWatchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sslwatch".into(),
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
    use crate::tools::test_support::reconciler;

    #[tokio::test]
    async fn test_all_tools_are_routed() {
        let (reconciler, config) = reconciler().await;
        let server = SslWatchServer::new(reconciler, config);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, ["domain_delete", "domain_get", "domain_list", "domain_observe", "domain_recent"]);
    }
}
