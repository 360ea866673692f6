//! Error types for the SysML MCP server
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use std::time::Duration;
use thiserror::Error;

/// Main error type for SysML MCP operations
#[derive(Error, Debug)]
pub enum SysmlMcpError {
    /// Backend answered with a non-success status
    #[error("Backend returned {status} for {url}: {body}")]
    BackendStatus {
        status: u16,
        url: String,
        body: String,
    },

    /// Backend returned a payload that does not match the expected shape
    #[error("Backend response could not be decoded: {0}")]
    BackendDecode(String),

    /// A backend call did not finish within its budget
    #[error("Backend call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid backend URL or path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A tool with the same name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for SysML MCP operations
pub type Result<T> = std::result::Result<T, SysmlMcpError>;

/// Convert anyhow::Error to SysmlMcpError
impl From<anyhow::Error> for SysmlMcpError {
    fn from(err: anyhow::Error) -> Self {
        SysmlMcpError::Other(err.to_string())
    }
}

impl SysmlMcpError {
    /// Shorthand for a configuration error carrying only a message
    pub fn config(message: impl Into<String>) -> Self {
        SysmlMcpError::Config(config::ConfigError::Message(message.into()))
    }
}
