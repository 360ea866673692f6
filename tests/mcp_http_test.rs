//! Integration tests for the `/mcp` endpoint
//!
//! Drives the full router: envelope decoding, dispatch, tool execution
//! against the in-memory store, and the optional bearer gate.

mod common;

use axum::http::{header::WWW_AUTHENTICATE, StatusCode};
use chrono::Duration;
use common::*;
use serde_json::json;
use sysml_mcp::backend::InMemoryBackend;

#[tokio::test]
async fn test_list_projects_on_empty_store() {
    let app = test_app_with(InMemoryBackend::new(), false);
    let body = json!({
        "jsonrpc": "2.0",
        "id": "7",
        "method": "tools/call",
        "params": {"name": "list_projects", "arguments": {}}
    });

    let response = send(&app, mcp_request(body.to_string(), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let reply = body_json(response).await;
    assert_eq!(reply["jsonrpc"], "2.0");
    assert_eq!(reply["id"], "7");
    assert!(reply.get("error").is_none());
    assert_eq!(reply["result"]["isError"], false);
    assert!(reply["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Found 0 projects:"));
}

#[tokio::test]
async fn test_numeric_id_is_echoed_as_number() {
    let app = test_app(false);
    let body = json!({"jsonrpc": "2.0", "id": 42, "method": "tools/list"});

    let reply = body_json(send(&app, mcp_request(body.to_string(), None)).await).await;
    assert_eq!(reply["id"], 42);
    assert_eq!(reply["result"]["tools"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_initialize_handshake() {
    let app = test_app(false);
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "clientInfo": {"name": "inspector", "version": "1.0"}
        }
    });

    let reply = body_json(send(&app, mcp_request(body.to_string(), None)).await).await;
    assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
    assert!(reply["result"]["serverInfo"]["name"].is_string());

    let notification = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    let response = send(&app, mcp_request(notification.to_string(), None)).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_garbage_body_is_invalid_request() {
    let app = test_app(false);

    let response = send(&app, mcp_request("{not json", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let reply = body_json(response).await;
    assert_eq!(reply["error"]["code"], -32600);
    assert!(reply["id"].is_null());
    assert!(reply.get("result").is_none());
}

#[tokio::test]
async fn test_wrong_version_echoes_recoverable_id() {
    let app = test_app(false);
    let body = json!({"jsonrpc": "1.0", "id": "abc", "method": "tools/list"});

    let response = send(&app, mcp_request(body.to_string(), None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let reply = body_json(response).await;
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["id"], "abc");
}

#[tokio::test]
async fn test_unknown_method() {
    let app = test_app(false);
    let body = json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/list"});

    let response = send(&app, mcp_request(body.to_string(), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["error"]["code"], -32601);
}

#[tokio::test]
async fn test_missing_argument_never_reaches_store() {
    let app = test_app(false);
    let body = json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "tools/call",
        "params": {"name": "get_element", "arguments": {"projectId": "demo-drone"}}
    });

    let reply = body_json(send(&app, mcp_request(body.to_string(), None)).await).await;
    assert_eq!(reply["result"]["isError"], true);
    assert_eq!(
        reply["result"]["content"][0]["text"],
        "Missing required parameter: elementId"
    );
    assert_eq!(app.backend.request_count(), 0);
}

#[tokio::test]
async fn test_create_then_delete_project() {
    let app = test_app(false);
    let create = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {
            "name": "create_project",
            "arguments": {"name": "Rover", "description": "Planetary rover"}
        }
    });
    let reply = body_json(send(&app, mcp_request(create.to_string(), None)).await).await;
    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Project created successfully:\n"));

    let created: serde_json::Value =
        serde_json::from_str(text.trim_start_matches("Project created successfully:\n")).unwrap();
    let project_id = created["@id"].as_str().unwrap().to_string();

    let delete = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "delete_project", "arguments": {"projectId": project_id}}
    });
    let reply = body_json(send(&app, mcp_request(delete.to_string(), None)).await).await;
    assert_eq!(reply["result"]["isError"], false);
    assert_eq!(
        reply["result"]["content"][0]["text"],
        format!("Project {} deleted successfully", project_id)
    );

    // Second delete finds nothing
    let reply = body_json(send(&app, mcp_request(delete.to_string(), None)).await).await;
    assert_eq!(reply["result"]["isError"], true);
}

#[tokio::test]
async fn test_auth_required_without_token() {
    let app = test_app(true);
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});

    let response = send(&app, mcp_request(body.to_string(), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response
        .headers()
        .get(WWW_AUTHENTICATE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("Bearer"));
    assert_eq!(body_json(response).await["error"], "invalid_token");

    let response = send(&app, mcp_request(body.to_string(), Some("forged"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_required_with_valid_token() {
    let app = test_app(true);
    let token = client_credentials_token(&app).await;
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});

    let response = send(&app, mcp_request(body.to_string(), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["result"]["tools"].is_array());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = test_app(true);
    let token = client_credentials_token(&app).await;

    app.clock.advance(Duration::seconds(3601));

    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
    let response = send(&app, mcp_request(body.to_string(), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let app = test_app(true);
    let request = axum::http::Request::get("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
