//! MCP facade over rmcp's streamable HTTP transport
//!
//! Everything the router classifies as the tool surface lands here. `/mcp`
//! is served by `StreamableHttpService` in stateless mode: each POST carries
//! one JSON-RPC message and the reply comes back as a server-sent event.
//! Other paths get a JSON-RPC "unknown operation" error so agents see a
//! uniform error shape.

use std::sync::Arc;

use axum::Router;
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::{Value, json};
use tracing::debug;

use crate::handlers::json_response;
use crate::tools::{DriveTools, ToolOutput, tool_definitions};

pub const MCP_PATH: &str = "/mcp";

const INSTRUCTIONS: &str = "Read-only access to the owner's Google Drive file metadata. \
If a tool reports that no account is connected, ask the owner to open /auth on this server.";

/// rmcp server handler exposing the Drive tools.
#[derive(Clone)]
pub struct DriveMcpServer {
    tools: Arc<DriveTools>,
}

impl DriveMcpServer {
    pub fn new(tools: Arc<DriveTools>) -> Self {
        Self { tools }
    }
}

impl ServerHandler for DriveMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("Google Drive gateway".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: tool_definitions(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let CallToolRequestParam { name, arguments } = request;
        let arguments = arguments.map(Value::Object).unwrap_or(Value::Null);
        match self.tools.call(&name, arguments).await {
            Some(output) => Ok(call_tool_result(&output)),
            None => {
                debug!(tool = %name, "unknown tool requested");
                Err(McpError::new(
                    ErrorCode::INVALID_PARAMS,
                    format!("unknown tool: {name}"),
                    None,
                ))
            }
        }
    }
}

/// Wrap a tool payload as an MCP `CallToolResult`.
///
/// The same JSON goes out twice: as the text content for clients that only
/// read text, and as structured content.
fn call_tool_result(output: &ToolOutput) -> CallToolResult {
    let structured = serde_json::to_value(output)
        .unwrap_or_else(|e| json!({ "error": format!("failed to encode tool result: {e}") }));
    CallToolResult {
        content: vec![Content::text(structured.to_string())],
        structured_content: Some(structured),
        is_error: Some(output.is_error()),
        meta: None,
    }
}

/// Router for the tool surface: the MCP endpoint plus an unknown-operation
/// fallback for every other path.
pub fn tool_router(tools: Arc<DriveTools>) -> Router {
    let config = StreamableHttpServerConfig {
        stateful_mode: false,
        ..Default::default()
    };
    let service = StreamableHttpService::new(
        move || Ok(DriveMcpServer::new(tools.clone())),
        Arc::new(LocalSessionManager::default()),
        config,
    );

    Router::new()
        .route_service(MCP_PATH, service)
        .fallback(unknown_operation)
}

async fn unknown_operation(uri: Uri) -> Response {
    let path = uri.path();
    debug!(path, "unknown tool-surface operation");
    json_response(
        StatusCode::NOT_FOUND,
        json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {
                "code": ErrorCode::METHOD_NOT_FOUND.0,
                "message": format!("unknown operation: {path}"),
            },
        }),
    )
}
