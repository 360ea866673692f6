//! Shared state handed to every HTTP handler

use crate::backend::ModelBackend;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::mcp::{McpServer, ToolHandler, ToolRegistry};
use crate::oauth::{Clock, OAuthService};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub mcp: Arc<McpServer>,
    pub oauth: Arc<OAuthService>,
    /// Gate `/mcp` behind bearer tokens
    pub require_auth: bool,
    /// Base URL advertised in discovery, if pinned by configuration
    pub public_base_url: Option<String>,
    /// Host used for discovery URLs when the request carries none
    pub fallback_host: String,
}

impl AppState {
    /// Wire the dispatcher and authorization server from configuration
    pub fn from_config(
        config: &ServerConfig,
        backend: Arc<dyn ModelBackend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let handler = ToolHandler::new(
            ToolRegistry::builtin()?,
            backend,
            Duration::from_secs(config.backend.call_timeout_secs),
        );

        Ok(Self {
            mcp: Arc::new(McpServer::new(handler)),
            oauth: Arc::new(OAuthService::from_config(&config.auth, clock)),
            require_auth: config.auth.require_auth,
            public_base_url: config
                .server
                .public_base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            fallback_host: config.server.bind_addr.clone(),
        })
    }
}
