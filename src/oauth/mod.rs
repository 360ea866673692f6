//! Minimal OAuth2 authorization server gating the MCP endpoint

pub mod clock;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use service::{
    AuthorizationServerMetadata, AuthorizeRequest, OAuthError, OAuthErrorCode, OAuthService,
    TokenRequest, TokenResponse, DEFAULT_SCOPE,
};
pub use store::{AccessToken, GrantStore};
