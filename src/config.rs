//! Server configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config`)
//! 3. Environment variables `SYSML_MCP_<SECTION>__<KEY>`, e.g.
//!    `SYSML_MCP_AUTH__REQUIRE_AUTH=true`
//! 4. `SYSML_API_BASE_URL`, which overrides `backend.base_url`

use crate::error::{Result, SysmlMcpError};
use config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use tracing::{debug, warn};

/// Prefix for layered environment overrides
pub const ENV_PREFIX: &str = "SYSML_MCP";

/// Single-variable override for the backend base URL
pub const BASE_URL_ENV: &str = "SYSML_API_BASE_URL";

/// Client id seeded when no clients are configured
pub const DEFAULT_CLIENT_ID: &str = "sysml-mcp-client";

const PLACEHOLDER_SECRET: &str = "change-me";
const REDACTED: &str = "********";

/// Which model store the tools talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Http,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: String,
    /// Externally visible base URL for discovery; derived from request
    /// headers when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: String,
    /// Upper bound on one tool call's backend round trip
    pub call_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Http,
            base_url: "https://sysml-api-webapp-2024.azurewebsites.net".to_string(),
            call_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Reject `/mcp` calls without a valid bearer token
    pub require_auth: bool,
    pub access_token_ttl_secs: u64,
    pub authorization_code_ttl_secs: u64,
    pub clients: Vec<ClientConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            access_token_ttl_secs: 3600,
            authorization_code_ttl_secs: 600,
            clients: vec![ClientConfig {
                id: DEFAULT_CLIENT_ID.to_string(),
                secret: PLACEHOLDER_SECRET.to_string(),
            }],
        }
    }
}

impl AuthConfig {
    pub fn uses_placeholder_secret(&self) -> bool {
        self.clients.iter().any(|c| c.secret == PLACEHOLDER_SECRET)
    }
}

/// Effective server configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
}

// TTLs are converted to chrono durations in seconds
const MAX_TTL_SECS: u64 = 365 * 24 * 3600;

impl ServerConfig {
    /// Load defaults, the optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.apply_base_url_override(env::var(BASE_URL_ENV).ok());
        config.validate()?;

        if config.auth.uses_placeholder_secret() {
            warn!(
                "OAuth client table uses the placeholder secret; set auth.clients before exposing this server"
            );
        }
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: ServerConfig = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_base_url_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            debug!("Backend base URL overridden by {}", BASE_URL_ENV);
            self.backend.base_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(SysmlMcpError::config("server.bind_addr must not be empty"));
        }
        if let Some(base) = &self.server.public_base_url {
            Url::parse(base).map_err(|e| {
                SysmlMcpError::config(format!("server.public_base_url is invalid: {}", e))
            })?;
        }

        if self.backend.kind == BackendKind::Http {
            Url::parse(&self.backend.base_url).map_err(|e| {
                SysmlMcpError::config(format!(
                    "backend.base_url '{}' is invalid: {}",
                    self.backend.base_url, e
                ))
            })?;
        }
        if self.backend.call_timeout_secs == 0 || self.backend.connect_timeout_secs == 0 {
            return Err(SysmlMcpError::config("backend timeouts must be positive"));
        }

        let auth = &self.auth;
        for (name, ttl) in [
            ("auth.access_token_ttl_secs", auth.access_token_ttl_secs),
            ("auth.authorization_code_ttl_secs", auth.authorization_code_ttl_secs),
        ] {
            if ttl == 0 || ttl > MAX_TTL_SECS {
                return Err(SysmlMcpError::config(format!(
                    "{} must be between 1 and {}",
                    name, MAX_TTL_SECS
                )));
            }
        }

        let mut seen = HashSet::new();
        for client in &auth.clients {
            if client.id.trim().is_empty() || client.secret.is_empty() {
                return Err(SysmlMcpError::config(
                    "auth.clients entries need a non-empty id and secret",
                ));
            }
            if !seen.insert(client.id.as_str()) {
                return Err(SysmlMcpError::config(format!(
                    "duplicate OAuth client id '{}'",
                    client.id
                )));
            }
        }
        if auth.require_auth && auth.clients.is_empty() {
            return Err(SysmlMcpError::config(
                "auth.require_auth is set but no clients are configured",
            ));
        }

        Ok(())
    }

    /// TOML rendering with client secrets masked
    pub fn redacted(&self) -> Result<String> {
        let mut copy = self.clone();
        for client in &mut copy.auth.clients {
            client.secret = REDACTED.to_string();
        }
        toml::to_string_pretty(&copy).map_err(|e| SysmlMcpError::Other(e.to_string()))
    }
}
