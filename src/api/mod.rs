//! HTTP API
//!
//! Provides:
//! - `POST /mcp` JSON-RPC endpoint, optionally bearer-gated
//! - OAuth2 discovery, authorize and token endpoints
//! - Health check

pub mod auth;
pub mod server;
pub mod state;

pub use server::{build_router, serve};
pub use state::AppState;
