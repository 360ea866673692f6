//! MCP method dispatcher
//!
//! Routes decoded JSON-RPC requests to `initialize`, `tools/list` and
//! `tools/call`. Holds no per-session state: every request is answered from
//! the tool registry and the backend alone.

use super::protocol::{self, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::tools::ToolHandler;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// MCP protocol revision this server speaks
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "sysml-mcp-server";

/// What the transport should send back for one request body
#[derive(Debug, Clone, PartialEq)]
pub enum McpReply {
    /// A protocol-level answer (success or JSON-RPC error)
    Response(JsonRpcResponse),
    /// The body could not be decoded into an envelope at all
    Rejected(JsonRpcResponse),
    /// A notification was accepted; nothing to send
    Accepted,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    protocol_version: Option<String>,
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// MCP server that handles JSON-RPC requests
pub struct McpServer {
    tool_handler: ToolHandler,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(tool_handler: ToolHandler) -> Self {
        Self { tool_handler }
    }

    /// Decode a raw body and dispatch it
    pub async fn handle_bytes(&self, body: &[u8]) -> McpReply {
        match protocol::decode(body) {
            Ok(request) => match self.handle_request(request).await {
                Some(response) => McpReply::Response(response),
                None => McpReply::Accepted,
            },
            Err(e) => {
                warn!("Rejecting undecodable MCP request: {}", e);
                McpReply::Rejected(e.into_response())
            }
        }
    }

    /// Process a single JSON-RPC request; `None` for notifications
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() && request.method.starts_with("notifications/") {
            debug!("Received notification: {}", request.method);
            return None;
        }

        let response = match request.method.as_str() {
            // MCP protocol methods
            "initialize" => self.handle_initialize(request),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request).await,

            // Unknown method
            _ => {
                debug!("Unknown method: {}", request.method);
                JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(&request.method))
            }
        };
        Some(response)
    }

    /// Handle initialize request
    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: InitializeParams = match request.params {
            Value::Null => InitializeParams::default(),
            params => serde_json::from_value(params).unwrap_or_else(|e| {
                debug!("Ignoring malformed initialize params: {}", e);
                InitializeParams::default()
            }),
        };

        let (client, version) = params
            .client_info
            .map(|c| (c.name, c.version))
            .unwrap_or_default();
        info!(
            "MCP client initialized: {} v{}",
            client.as_deref().unwrap_or("unknown"),
            version.as_deref().unwrap_or("unknown")
        );

        if let Some(requested) = params.protocol_version.as_deref() {
            if requested != PROTOCOL_VERSION {
                debug!(
                    "Client requested protocol {}, answering with {}",
                    requested, PROTOCOL_VERSION
                );
            }
        }

        JsonRpcResponse::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {"listChanged": false}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling tools/list");

        let tools = self.tool_handler.list_tools();
        JsonRpcResponse::success(request.id, json!({ "tools": tools }))
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(request.params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_params(format!("Invalid tool call parameters: {}", e)),
                );
            }
        };

        let arguments = params.arguments.unwrap_or_default();
        let result = self.tool_handler.execute(&params.name, &arguments).await;

        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => JsonRpcResponse::error(
                request.id,
                JsonRpcError::internal_error(format!("Failed to encode tool result: {}", e)),
            ),
        }
    }
}
