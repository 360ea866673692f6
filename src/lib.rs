//! SysML MCP - Model Context Protocol server for SysML v2 model stores
//!
//! Exposes project and element operations of a SysML v2 API as MCP tools
//! that AI-agent clients discover and invoke over JSON-RPC 2.0, with an
//! optional OAuth2 gate in front of the endpoint.
//!
//! # Architecture
//!
//! - **MCP**: envelope codec, method dispatcher and tool registry
//! - **Backend**: the remote project/element store behind a narrow trait
//! - **OAuth**: authorization-code and client-credentials grants, token validation
//! - **API**: axum router wiring the above onto HTTP
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sysml_mcp::{api, backend::InMemoryBackend, oauth::SystemClock, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load(None)?;
//!     let state = AppState::from_config(
//!         &config,
//!         Arc::new(InMemoryBackend::sample()),
//!         Arc::new(SystemClock),
//!     )?;
//!     api::serve(config.server.bind_addr.parse()?, state).await
//! }
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod mcp;
pub mod oauth;
pub mod types;

// Re-export commonly used types
pub use api::AppState;
pub use backend::{HttpModelBackend, InMemoryBackend, ModelBackend};
pub use config::ServerConfig;
pub use error::{Result, SysmlMcpError};
pub use mcp::{McpServer, ToolHandler, ToolRegistry};
pub use oauth::{OAuthError, OAuthService};
pub use types::{Element, Project};
