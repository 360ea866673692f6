//! OAuth2 authorization server
//!
//! Auto-approving authorization-code and client-credentials flows against a
//! static client table. Every failure is an [`OAuthError`] carrying the
//! standard error code and the HTTP status it should be answered with.

use super::clock::Clock;
use super::store::{redact, AccessToken, GrantStore};
use crate::config::{AuthConfig, ClientConfig};
use axum::http::StatusCode;
use chrono::Duration;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scope granted when the client does not ask for one
pub const DEFAULT_SCOPE: &str = "mcp:read mcp:write";

/// Standard OAuth2 error vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnsupportedResponseType,
    UnsupportedGrantType,
    InvalidToken,
    ServerError,
}

impl OAuthErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthErrorCode::InvalidRequest => "invalid_request",
            OAuthErrorCode::InvalidClient => "invalid_client",
            OAuthErrorCode::InvalidGrant => "invalid_grant",
            OAuthErrorCode::UnsupportedResponseType => "unsupported_response_type",
            OAuthErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            OAuthErrorCode::InvalidToken => "invalid_token",
            OAuthErrorCode::ServerError => "server_error",
        }
    }
}

impl fmt::Display for OAuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth error body plus the status it is served with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{error}: {error_description}")]
pub struct OAuthError {
    pub error: OAuthErrorCode,
    pub error_description: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl OAuthError {
    fn new(error: OAuthErrorCode, status: StatusCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: description.into(),
            status,
        }
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidRequest, StatusCode::BAD_REQUEST, description)
    }

    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidClient, StatusCode::BAD_REQUEST, description)
    }

    /// Credential mismatch at the token endpoint
    pub fn bad_credentials() -> Self {
        Self::new(
            OAuthErrorCode::InvalidClient,
            StatusCode::UNAUTHORIZED,
            "Invalid client credentials",
        )
    }

    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidGrant, StatusCode::BAD_REQUEST, description)
    }

    pub fn unsupported_response_type(response_type: &str) -> Self {
        Self::new(
            OAuthErrorCode::UnsupportedResponseType,
            StatusCode::BAD_REQUEST,
            format!("Unsupported response_type: {}", response_type),
        )
    }

    pub fn unsupported_grant_type(grant_type: &str) -> Self {
        Self::new(
            OAuthErrorCode::UnsupportedGrantType,
            StatusCode::BAD_REQUEST,
            format!("Unsupported grant_type: {}", grant_type),
        )
    }

    pub fn invalid_token() -> Self {
        Self::new(
            OAuthErrorCode::InvalidToken,
            StatusCode::UNAUTHORIZED,
            "Missing, invalid or expired access token",
        )
    }

    pub fn server_error(description: impl Into<String>) -> Self {
        Self::new(
            OAuthErrorCode::ServerError,
            StatusCode::INTERNAL_SERVER_ERROR,
            description,
        )
    }
}

/// RFC 8414 discovery document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub scopes_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
}

/// Query parameters of `GET /oauth/authorize`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
}

/// Body of `POST /oauth/token`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Compare secrets without short-circuiting on the first differing byte
fn secrets_match(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extract the token from an `Authorization` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    non_blank(Some(token))
}

pub struct OAuthService {
    clients: HashMap<String, String>,
    store: GrantStore,
}

impl OAuthService {
    pub fn new(
        clients: &[ClientConfig],
        clock: Arc<dyn Clock>,
        code_ttl: Duration,
        token_ttl: Duration,
    ) -> Self {
        let clients = clients
            .iter()
            .map(|c| (c.id.clone(), c.secret.clone()))
            .collect();
        Self {
            clients,
            store: GrantStore::new(clock, code_ttl, token_ttl),
        }
    }

    pub fn from_config(auth: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            &auth.clients,
            clock,
            Duration::seconds(auth.authorization_code_ttl_secs as i64),
            Duration::seconds(auth.access_token_ttl_secs as i64),
        )
    }

    pub fn store(&self) -> &GrantStore {
        &self.store
    }

    /// Discovery document rooted at `base_url`
    pub fn metadata(&self, base_url: &str) -> AuthorizationServerMetadata {
        let base = base_url.trim_end_matches('/');
        AuthorizationServerMetadata {
            issuer: base.to_string(),
            authorization_endpoint: format!("{}/oauth/authorize", base),
            token_endpoint: format!("{}/oauth/token", base),
            response_types_supported: vec!["code"],
            grant_types_supported: vec!["authorization_code", "client_credentials"],
            scopes_supported: vec!["mcp:read", "mcp:write"],
            token_endpoint_auth_methods_supported: vec!["client_secret_post"],
        }
    }

    /// Auto-approve an authorization request; returns the redirect location
    pub async fn authorize(&self, request: &AuthorizeRequest) -> Result<String, OAuthError> {
        let client_id = non_blank(request.client_id.as_deref())
            .filter(|id| self.clients.contains_key(*id))
            .ok_or_else(|| OAuthError::invalid_client("Unknown client_id"))?;

        let response_type = request.response_type.as_deref().unwrap_or_default();
        if response_type != "code" {
            return Err(OAuthError::unsupported_response_type(response_type));
        }

        let redirect_uri = non_blank(request.redirect_uri.as_deref())
            .ok_or_else(|| OAuthError::invalid_request("redirect_uri is required"))?;
        let mut location = Url::parse(redirect_uri)
            .map_err(|_| OAuthError::invalid_request("redirect_uri must be an absolute URL"))?;

        let scope = non_blank(request.scope.as_deref()).unwrap_or(DEFAULT_SCOPE);
        let code = self.store.issue_code(client_id, redirect_uri, scope).await;
        info!("Issued authorization code for client {}", client_id);

        {
            let mut query = location.query_pairs_mut();
            query.append_pair("code", &code.code);
            if let Some(state) = request.state.as_deref() {
                query.append_pair("state", state);
            }
        }
        Ok(location.into())
    }

    /// Exchange a grant for an access token
    pub async fn token(&self, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
        let client_id = self.authenticate(request)?;

        let token = match request.grant_type.as_deref().unwrap_or_default() {
            "authorization_code" => {
                let code = non_blank(request.code.as_deref())
                    .ok_or_else(|| OAuthError::invalid_request("code is required"))?;
                let grant = self
                    .store
                    .redeem_code(code, client_id, non_blank(request.redirect_uri.as_deref()))
                    .await
                    .map_err(|e| {
                        warn!("Rejected authorization code for client {}: {:?}", client_id, e);
                        OAuthError::invalid_grant(e.description())
                    })?;
                self.store.issue_token(client_id, &grant.scope).await
            }
            "client_credentials" => {
                let scope = non_blank(request.scope.as_deref()).unwrap_or(DEFAULT_SCOPE);
                self.store.issue_token(client_id, scope).await
            }
            other => return Err(OAuthError::unsupported_grant_type(other)),
        };

        info!(
            "Issued access token {} for client {}",
            redact(&token.token),
            client_id
        );
        Ok(TokenResponse {
            expires_in: self.store.token_ttl().num_seconds(),
            access_token: token.token,
            token_type: "Bearer",
            scope: token.scope,
        })
    }

    fn authenticate<'a>(&self, request: &'a TokenRequest) -> Result<&'a str, OAuthError> {
        let client_id = non_blank(request.client_id.as_deref());
        let secret = request.client_secret.as_deref().unwrap_or_default();

        match client_id.and_then(|id| self.clients.get(id).map(|expected| (id, expected))) {
            Some((id, expected)) if secrets_match(expected, secret) => Ok(id),
            _ => {
                warn!(
                    "Client authentication failed for {}",
                    client_id.unwrap_or("<missing>")
                );
                Err(OAuthError::bad_credentials())
            }
        }
    }

    /// Look up a bearer token
    pub async fn validate(&self, token: &str) -> Option<AccessToken> {
        self.store.validate_token(token).await
    }

    /// Validate a raw `Authorization` header value
    pub async fn validate_header(&self, header: Option<&str>) -> Result<AccessToken, OAuthError> {
        let token = header.and_then(bearer_token).ok_or_else(|| {
            debug!("Request without a bearer token");
            OAuthError::invalid_token()
        })?;
        self.validate(token).await.ok_or_else(|| {
            debug!("Rejected access token {}", redact(token));
            OAuthError::invalid_token()
        })
    }
}
