//! Integration tests for the http MCP transport.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use comfy_bridge::config::Config;
use comfy_bridge::engine::ComfyClient;
use comfy_bridge::mcp::{http, McpServer};
use comfy_bridge::state::AppState;
use comfy_bridge::test_util::ScriptedEngine;
use comfy_bridge_common::JobStatus;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_with(engine: ScriptedEngine) -> Router {
    let state = Arc::new(AppState::new(Config::default(), Arc::new(engine)));
    http::router(Arc::new(McpServer::new(state)))
}

async fn post_mcp(app: Router, body: String) -> (StatusCode, Option<Value>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, json)
}

async fn call_tool(app: Router, name: &str, arguments: Value) -> (Value, bool) {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let (status, response) = post_mcp(app, request.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let result = &response.unwrap()["result"];
    let text = result["content"][0]["text"].as_str().unwrap();
    (
        serde_json::from_str(text).unwrap(),
        result["isError"].as_bool().unwrap(),
    )
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app_with(ScriptedEngine::with_statuses(Vec::new()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let app = app_with(ScriptedEngine::with_statuses(Vec::new()));

    let (_, init) = post_mcp(
        app.clone(),
        json!({"jsonrpc": "2.0", "id": "init", "method": "initialize", "params": {}}).to_string(),
    )
    .await;
    let init = init.unwrap();
    assert_eq!(init["id"], "init");
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");

    let (_, listed) = post_mcp(
        app,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
    )
    .await;
    let names: Vec<String> = listed.unwrap()["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    for expected in [
        "list_checkpoints",
        "list_loras",
        "list_vaes",
        "get_node_info",
        "search_nodes",
        "execute_workflow",
        "get_workflow_status",
        "wait_for_completion",
        "get_system_stats",
        "free_memory",
        "interrupt",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {}", expected);
    }
}

#[tokio::test]
async fn test_notification_is_accepted_without_body() {
    let app = app_with(ScriptedEngine::with_statuses(Vec::new()));
    let (status, body) = post_mcp(
        app,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let app = app_with(ScriptedEngine::with_statuses(Vec::new()));
    let (status, body) = post_mcp(app, "{\"jsonrpc\": ".to_string()).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_execute_then_check_status() {
    let app = app_with(ScriptedEngine::with_statuses([JobStatus::Completed]));

    let (receipt, is_error) = call_tool(
        app.clone(),
        "execute_workflow",
        json!({"workflow": {"1": {"class_type": "EmptyLatentImage", "inputs": {"width": 512}}}}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(receipt["status"], "queued");

    let (status, is_error) = call_tool(
        app,
        "get_workflow_status",
        json!({"prompt_id": receipt["prompt_id"]}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(status["status"], "completed");
}

#[tokio::test]
async fn test_engine_down_is_tool_error() {
    let app = app_with(ScriptedEngine::unreachable());
    let (body, is_error) = call_tool(app, "list_checkpoints", json!({})).await;
    assert!(is_error);
    assert_eq!(body["kind"], "transport");
    assert!(body.get("checkpoints").is_none());
}

#[tokio::test]
async fn test_list_checkpoints_through_real_client() {
    let comfy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/object_info/CheckpointLoaderSimple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CheckpointLoaderSimple": {
                "input": {"required": {"ckpt_name": ["COMBO", {"options": ["flux1-dev.safetensors"]}]}}
            }
        })))
        .mount(&comfy)
        .await;

    let mut config = Config::default();
    config.engine.base_url = comfy.uri();
    let engine = Arc::new(ComfyClient::new(&config.engine).unwrap());
    let app = http::router(Arc::new(McpServer::new(Arc::new(AppState::new(config, engine)))));

    let (body, is_error) = call_tool(app, "list_checkpoints", json!({})).await;
    assert!(!is_error);
    assert_eq!(body, json!({"checkpoints": ["flux1-dev.safetensors"]}));
}
