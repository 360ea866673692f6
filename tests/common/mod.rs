//! Common test utilities and helpers

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, Response},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use sysml_mcp::{
    api::{build_router, AppState},
    backend::InMemoryBackend,
    config::{ClientConfig, ServerConfig},
    oauth::ManualClock,
};
use tower::ServiceExt;

pub const CLIENT_ID: &str = "test-agent";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "http://localhost:6274/oauth/callback";

/// Router plus the handles tests poke at
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub backend: Arc<InMemoryBackend>,
}

pub fn test_config(require_auth: bool) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.require_auth = require_auth;
    config.auth.clients = vec![ClientConfig {
        id: CLIENT_ID.to_string(),
        secret: CLIENT_SECRET.to_string(),
    }];
    config
}

/// Build an app over the given store
pub fn test_app_with(backend: InMemoryBackend, require_auth: bool) -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let backend = Arc::new(backend);
    let state = AppState::from_config(&test_config(require_auth), backend.clone(), clock.clone())
        .expect("Failed to build app state");

    TestApp {
        router: build_router(state),
        clock,
        backend,
    }
}

/// App over the sample store
pub fn test_app(require_auth: bool) -> TestApp {
    test_app_with(InMemoryBackend::sample(), require_auth)
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router
        .clone()
        .oneshot(request)
        .await
        .expect("Router is infallible")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// `POST /mcp` with a raw body and optional bearer token
pub fn mcp_request(body: impl Into<Body>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/mcp").header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(body.into()).expect("Valid request")
}

/// `POST /oauth/token` with a JSON body
pub fn token_request(body: &Value) -> Request<Body> {
    Request::post("/oauth/token")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Valid request")
}

/// Mint a token through the client-credentials grant
pub async fn client_credentials_token(app: &TestApp) -> String {
    let response = send(
        app,
        token_request(&serde_json::json!({
            "grant_type": "client_credentials",
            "client_id": CLIENT_ID,
            "client_secret": CLIENT_SECRET,
        })),
    )
    .await;
    assert_eq!(response.status(), 200);

    body_json(response).await["access_token"]
        .as_str()
        .expect("access_token in response")
        .to_string()
}
