//! Model Context Protocol (MCP) server implementation
//!
//! JSON-RPC 2.0 envelope codec, method dispatcher and the tool registry that
//! exposes the SysML v2 project/element store to agent clients.

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use server::{McpReply, McpServer};
pub use tools::{ToolHandler, ToolRegistry, ToolResult};
