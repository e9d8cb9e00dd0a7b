//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] to rmcp's [`ServerHandler`] so any MCP
//! client (stdio or Streamable HTTP) can list and call the tools.
//!
//! Error mapping:
//!
//! | Situation | MCP result |
//! |-----------|------------|
//! | unknown tool name | `method_not_found` |
//! | bad arguments or CQL | `invalid_params` |
//! | backend failure | `CallToolResult` with `is_error` |

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::Value;

use crate::config::Config;
use crate::confluence::create_gateway;
use crate::diagnostics::TracingDiagnostics;
use crate::tools::{ToolContext, ToolError, ToolRegistry};

/// Bridges the tool registry to the MCP protocol.
///
/// Each MCP session receives a clone of this struct (everything is behind
/// `Arc`), so all sessions share one gateway and one HTTP connection pool.
#[derive(Clone)]
pub struct McpBridge {
    tools: Arc<ToolRegistry>,
    ctx: ToolContext,
}

impl McpBridge {
    pub fn new(tools: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        Self { tools, ctx }
    }

    /// Bridge over the built-in tools, talking to the configured site.
    pub fn from_config(config: Config) -> Self {
        let gateway = create_gateway(&config, Arc::new(TracingDiagnostics));
        let ctx = ToolContext::new(Arc::new(config), gateway);
        Self::new(Arc::new(ToolRegistry::with_builtins()), ctx)
    }

    /// Convert a tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::tools::Tool) -> Tool {
        let input_schema = match tool.parameters_schema() {
            Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: tool.title().map(str::to_string),
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: match tool.output_schema() {
                Some(Value::Object(map)) => Some(Arc::new(map)),
                _ => None,
            },
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    /// Runs a tool by name. `call_tool` is a thin wrapper over this.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", name),
                None,
            )
        })?;

        let params = arguments
            .map(Value::Object)
            .unwrap_or(Value::Object(serde_json::Map::new()));

        match tool.execute(params, &self.ctx).await {
            Ok(output) => {
                let mut result = if output.is_error {
                    CallToolResult::error(vec![Content::text(output.text)])
                } else {
                    CallToolResult::success(vec![Content::text(output.text)])
                };
                if !output.structured.is_null() {
                    result.structured_content = Some(output.structured);
                }
                Ok(result)
            }
            Err(e) => match e.downcast_ref::<ToolError>() {
                Some(ToolError::InvalidParams(message)) => {
                    tracing::warn!(tool = name, error = %message, "invalid tool arguments");
                    Err(McpError::invalid_params(message.clone(), None))
                }
                None => {
                    tracing::error!(tool = name, error = %e, "tool failed");
                    Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
                }
            },
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "confluence-mcp".to_string(),
                title: Some("Confluence MCP".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only access to a Confluence site. Use confluence_search with a CQL \
                 query to find pages, then confluence_get_content with a result id to read \
                 the page body."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments).await
    }
}
