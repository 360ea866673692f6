//! HTTP surface: MCP endpoint, OAuth endpoints and health check

use super::{auth::require_bearer, state::AppState};
use crate::mcp::{protocol, McpReply};
use crate::oauth::{AuthorizationServerMetadata, AuthorizeRequest, OAuthError, TokenRequest};
use axum::{
    body::Bytes,
    extract::{FromRequest, Query, Request, State},
    http::{
        header::{CONTENT_TYPE, HOST, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Build router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // MCP
        .route(
            "/mcp",
            post(mcp_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_bearer,
            )),
        )
        // OAuth
        .route(
            "/.well-known/oauth-authorization-server",
            get(metadata_handler),
        )
        .route("/oauth/authorize", get(authorize_handler))
        .route("/oauth/token", post(token_handler))
        // Health check
        .route("/health", get(health_handler))
        // State
        .with_state(state)
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let require_auth = state.require_auth;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "SysML MCP server listening on http://{}/mcp (auth {})",
        listener.local_addr()?,
        if require_auth { "required" } else { "disabled" }
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
    }
}

fn json_body(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

/// JSON-RPC endpoint
async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match state.mcp.handle_bytes(&body).await {
        McpReply::Response(response) => json_body(StatusCode::OK, protocol::encode(&response)),
        McpReply::Rejected(response) => {
            json_body(StatusCode::BAD_REQUEST, protocol::encode(&response))
        }
        McpReply::Accepted => StatusCode::ACCEPTED.into_response(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Externally visible base URL for discovery documents
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.public_base_url {
        return base.clone();
    }
    let scheme = header_str(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header_str(headers, "x-forwarded-host")
        .or_else(|| header_str(headers, HOST.as_str()))
        .unwrap_or(&state.fallback_host);
    format!("{}://{}", scheme, host)
}

async fn metadata_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<AuthorizationServerMetadata> {
    let base = base_url(&state, &headers);
    debug!("Serving authorization server metadata for {}", base);
    Json(state.oauth.metadata(&base))
}

async fn authorize_handler(
    State(state): State<AppState>,
    query: Result<Query<AuthorizeRequest>, axum::extract::rejection::QueryRejection>,
) -> Response {
    let Query(request) = match query {
        Ok(query) => query,
        Err(e) => return OAuthError::invalid_request(e.body_text()).into_response(),
    };

    match state.oauth.authorize(&request).await {
        Ok(location) => match HeaderValue::try_from(location) {
            Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
            Err(_) => OAuthError::invalid_request("redirect_uri is not a valid header value")
                .into_response(),
        },
        Err(e) => {
            debug!("Authorization request rejected: {}", e);
            e.into_response()
        }
    }
}

/// Token endpoint; accepts JSON or form-encoded bodies
async fn token_handler(State(state): State<AppState>, request: Request) -> Response {
    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    let token_request = if is_form {
        match Form::<TokenRequest>::from_request(request, &()).await {
            Ok(Form(token_request)) => token_request,
            Err(e) => return OAuthError::invalid_request(e.body_text()).into_response(),
        }
    } else {
        let body = match Bytes::from_request(request, &()).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read token request body: {}", e);
                return OAuthError::server_error("Failed to read request body").into_response();
            }
        };
        match serde_json::from_slice::<TokenRequest>(&body) {
            Ok(token_request) => token_request,
            Err(_) => {
                return OAuthError::invalid_request("Malformed token request body").into_response()
            }
        }
    };

    match state.oauth.token(&token_request).await {
        Ok(token) => Json(token).into_response(),
        Err(e) => {
            debug!("Token request rejected: {}", e);
            e.into_response()
        }
    }
}

/// Health check handler
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
