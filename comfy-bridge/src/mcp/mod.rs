//! MCP server: JSON-RPC dispatch shared by the stdio and http transports.
//!
//! Supported methods:
//! - `initialize`, `ping`
//! - `tools/list`, `tools/call`
//! - `resources/list`, `resources/read`
//! - `notifications/initialized`, `notifications/cancelled`
//!
//! Tool failures never become JSON-RPC errors. They come back as a normal
//! result with `isError: true` so the agent can read the message.

pub mod http;
pub mod stdio;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use comfy_bridge_common::protocol::JSONRPC_VERSION;
use comfy_bridge_common::{
    CallToolParams, CallToolResult, CancelledParams, InitializeResult, JsonRpcMessage,
    JsonRpcResponse, ReadResourceParams, RequestId, Resource, ResourceContents, RpcError,
    ServerInfo, PROTOCOL_VERSION,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::state::AppState;
use crate::template::{self, Template};
use crate::tools;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// In-flight requests by id. A misbehaving host may reuse an id while the
/// first request is still running, so each entry carries its own ticket.
type InFlight = HashMap<RequestId, Vec<(u64, CancellationToken)>>;

/// Routes JSON-RPC messages to tool and resource handlers.
///
/// Keeps a cancellation token per in-flight request so a
/// `notifications/cancelled` can stop a long `wait_for_completion`.
pub struct McpServer {
    state: Arc<AppState>,
    in_flight: Mutex<InFlight>,
    next_ticket: AtomicU64,
}

/// A decoded message. Requests are registered for cancellation on decode.
pub enum Incoming {
    Request(PendingRequest),
    Notification(JsonRpcMessage),
}

/// A request that can already be cancelled but has not run yet.
pub struct PendingRequest {
    message: JsonRpcMessage,
    id: RequestId,
    ticket: u64,
    cancel: CancellationToken,
}

impl McpServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            in_flight: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Handle one raw line of input. Returns `None` for notifications.
    pub async fn handle_text(&self, text: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                tracing::warn!("MCP server: unparseable message: {}", e);
                Some(JsonRpcResponse::failure(None, RpcError::parse_error(e.to_string())))
            }
        }
    }

    /// Handle one decoded JSON value.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        match self.accept(value) {
            Ok(incoming) => self.process(incoming).await,
            Err(response) => Some(response),
        }
    }

    pub async fn handle(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match self.admit(message) {
            Ok(incoming) => self.process(incoming).await,
            Err(response) => Some(response),
        }
    }

    /// Decode `value` without running it. `Err` is the response to send back.
    ///
    /// Transports that run requests concurrently call this before spawning,
    /// so a cancellation or shutdown that arrives right after a request
    /// still reaches it.
    pub fn accept(&self, value: Value) -> Result<Incoming, JsonRpcResponse> {
        let id = value
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

        let message = serde_json::from_value::<JsonRpcMessage>(value).map_err(|e| {
            JsonRpcResponse::failure(id, RpcError::invalid_request(e.to_string()))
        })?;
        self.admit(message)
    }

    fn admit(&self, message: JsonRpcMessage) -> Result<Incoming, JsonRpcResponse> {
        if message.jsonrpc != JSONRPC_VERSION {
            return Err(JsonRpcResponse::failure(
                message.id,
                RpcError::invalid_request(format!("Unsupported jsonrpc version: {}", message.jsonrpc)),
            ));
        }

        let Some(id) = message.id.clone() else {
            return Ok(Incoming::Notification(message));
        };
        let (ticket, cancel) = self.track(&id);
        Ok(Incoming::Request(PendingRequest {
            message,
            id,
            ticket,
            cancel,
        }))
    }

    async fn process(&self, incoming: Incoming) -> Option<JsonRpcResponse> {
        match incoming {
            Incoming::Request(request) => Some(self.run(request).await),
            Incoming::Notification(message) => {
                self.notify(&message);
                None
            }
        }
    }

    /// Run an accepted request to its response.
    pub async fn run(&self, request: PendingRequest) -> JsonRpcResponse {
        let PendingRequest {
            message,
            id,
            ticket,
            cancel,
        } = request;
        tracing::debug!(method = %message.method, id = %id, "MCP server: incoming request");

        let outcome = self.dispatch(&message, &cancel).await;
        self.untrack(&id, ticket);

        match outcome {
            Ok(result) => JsonRpcResponse::success(Some(id), result),
            Err(error) => JsonRpcResponse::failure(Some(id), error),
        }
    }

    async fn dispatch(
        &self,
        message: &JsonRpcMessage,
        cancel: &CancellationToken,
    ) -> Result<Value, RpcError> {
        match message.method.as_str() {
            "initialize" => to_result(&self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::definitions() })),
            "tools/call" => {
                let params: CallToolParams = params(message)?;
                to_result(&self.call_tool(params, cancel).await)
            }
            "resources/list" => Ok(json!({ "resources": resources() })),
            "resources/read" => {
                let params: ReadResourceParams = params(message)?;
                let template = template::find(&params.uri).ok_or_else(|| {
                    RpcError::invalid_params(Error::UnknownResource(params.uri.clone()).to_string())
                })?;
                Ok(json!({ "contents": [contents(template)] }))
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }

    /// Act on a notification. Notifications never get a response.
    pub fn notify(&self, message: &JsonRpcMessage) {
        match message.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("MCP client initialized");
            }
            "notifications/cancelled" => {
                let Ok(params) = params::<CancelledParams>(message) else {
                    tracing::warn!("Ignoring malformed cancellation notice");
                    return;
                };
                if let Some(entries) = self.lock_in_flight().get(&params.request_id) {
                    tracing::info!(
                        "Cancelling request {} ({})",
                        params.request_id,
                        params.reason.as_deref().unwrap_or("no reason given")
                    );
                    for (_, token) in entries {
                        token.cancel();
                    }
                }
            }
            other => {
                tracing::debug!("Ignoring notification {}", other);
            }
        }
    }

    fn initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            }),
            server_info: ServerInfo {
                name: self.state.config.server.name.clone(),
                version: VERSION.to_string(),
            },
            instructions: Some(
                "Drive a ComfyUI server: discover models and nodes, submit workflows, then poll \
                 get_workflow_status or wait_for_completion with the returned prompt_id."
                    .to_string(),
            ),
        }
    }

    async fn call_tool(&self, params: CallToolParams, cancel: &CancellationToken) -> CallToolResult {
        tracing::info!("Tool call: {}", params.name);
        let arguments = params.arguments.unwrap_or(Value::Null);
        match tools::call(&self.state, &params.name, arguments, cancel).await {
            Ok(body) => CallToolResult::success(&body),
            Err(err) => {
                tracing::warn!("Tool {} failed: {}", params.name, err);
                CallToolResult::error(&err.to_json())
            }
        }
    }

    /// Cancel every in-flight request, e.g. when the host goes away.
    pub fn cancel_all(&self) {
        for (_, token) in self.lock_in_flight().values().flatten() {
            token.cancel();
        }
    }

    fn track(&self, id: &RequestId) -> (u64, CancellationToken) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        self.lock_in_flight()
            .entry(id.clone())
            .or_default()
            .push((ticket, cancel.clone()));
        (ticket, cancel)
    }

    /// Forget this request's token only, leaving others that share its id.
    fn untrack(&self, id: &RequestId, ticket: u64) {
        let mut in_flight = self.lock_in_flight();
        if let Some(entries) = in_flight.get_mut(id) {
            entries.retain(|(t, _)| *t != ticket);
            if entries.is_empty() {
                in_flight.remove(id);
            }
        }
    }

    #[cfg(test)]
    fn in_flight_count(&self) -> usize {
        self.lock_in_flight().values().map(Vec::len).sum()
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, InFlight> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn params<T: DeserializeOwned>(message: &JsonRpcMessage) -> Result<T, RpcError> {
    let params = message.params.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal(e.to_string()))
}

fn resources() -> Vec<Resource> {
    template::TEMPLATES
        .iter()
        .map(|t| Resource {
            uri: t.uri.to_string(),
            name: t.name.to_string(),
            description: Some(t.description.to_string()),
            mime_type: Some(Template::MIME_TYPE.to_string()),
        })
        .collect()
}

fn contents(template: &Template) -> ResourceContents {
    ResourceContents {
        uri: template.uri.to_string(),
        mime_type: Some(Template::MIME_TYPE.to_string()),
        text: template.body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use comfy_bridge_common::JobStatus;

    use crate::config::Config;
    use crate::test_util::ScriptedEngine;

    fn server(engine: ScriptedEngine) -> Arc<McpServer> {
        Arc::new(McpServer::new(Arc::new(AppState::new(
            Config::default(),
            Arc::new(engine),
        ))))
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcMessage {
        JsonRpcMessage::request(id, method, params)
    }

    fn tool_body(response: &JsonRpcResponse) -> (Value, bool) {
        let result: CallToolResult =
            serde_json::from_value(response.result.clone().unwrap()).unwrap();
        let body = serde_json::from_str(result.content[0].as_text()).unwrap();
        (body, result.is_error)
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let response = server
            .handle(request(1, "initialize", json!({"protocolVersion": PROTOCOL_VERSION})))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "comfyui-dynamic");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let message = JsonRpcMessage::notification("notifications/initialized", json!({}));
        assert!(server.handle(message).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let response = server.handle(request(3, "prompts/list", json!({}))).await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, RpcError::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: prompts/list");
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let response = server.handle_text("{not json").await.unwrap();
        assert_eq!(response.error.as_ref().unwrap().code, RpcError::PARSE_ERROR);
        let wire = serde_json::to_value(&response).unwrap();
        assert!(wire["id"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let response = server
            .handle_value(json!({"jsonrpc": "2.0", "id": 9}))
            .await
            .unwrap();
        assert_eq!(response.id, Some(RequestId::Number(9)));
        assert_eq!(response.error.unwrap().code, RpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tool_failure_is_a_result() {
        let server = server(ScriptedEngine::unreachable());
        let response = server
            .handle(request(4, "tools/call", json!({"name": "get_system_stats"})))
            .await
            .unwrap();
        assert!(response.error.is_none());
        let (body, is_error) = tool_body(&response);
        assert!(is_error);
        assert_eq!(body["kind"], "transport");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_result() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let response = server
            .handle(request(5, "tools/call", json!({"name": "nope", "arguments": {}})))
            .await
            .unwrap();
        let (body, is_error) = tool_body(&response);
        assert!(is_error);
        assert_eq!(body["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_tools_call_without_name() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let response = server.handle(request(6, "tools/call", json!({}))).await.unwrap();
        assert_eq!(response.error.unwrap().code, RpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resources() {
        let server = server(ScriptedEngine::with_statuses(Vec::new()));
        let listed = server.handle(request(7, "resources/list", json!({}))).await.unwrap();
        assert_eq!(
            listed.result.unwrap()["resources"][0]["uri"],
            "template://flux-txt2img"
        );

        let read = server
            .handle(request(8, "resources/read", json!({"uri": "template://flux-txt2img"})))
            .await
            .unwrap();
        let text = read.result.unwrap()["contents"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains(template::PROMPT_PLACEHOLDER));

        let missing = server
            .handle(request(9, "resources/read", json!({"uri": "template://nope"})))
            .await
            .unwrap();
        assert_eq!(missing.error.unwrap().code, RpcError::INVALID_PARAMS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_flight_wait() {
        let server = server(ScriptedEngine::with_statuses([JobStatus::Running]));

        let waiting = {
            let server = server.clone();
            tokio::spawn(async move {
                server
                    .handle(request(
                        10,
                        "tools/call",
                        json!({"name": "wait_for_completion", "arguments": {"prompt_id": "job-1"}}),
                    ))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(3)).await;
        let notice = JsonRpcMessage::notification(
            "notifications/cancelled",
            json!({"requestId": 10, "reason": "user aborted"}),
        );
        assert!(server.handle(notice).await.is_none());

        let response = waiting.await.unwrap().unwrap();
        let (body, is_error) = tool_body(&response);
        assert!(is_error);
        assert_eq!(body["kind"], "cancelled");
        assert_eq!(server.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reused_id_keeps_earlier_request_cancellable() {
        let server = server(ScriptedEngine::with_statuses([JobStatus::Running]));

        let waiting = {
            let server = server.clone();
            tokio::spawn(async move {
                server
                    .handle(request(
                        11,
                        "tools/call",
                        json!({"name": "wait_for_completion", "arguments": {"prompt_id": "job-1"}}),
                    ))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Same id, finishes first
        let pong = server.handle(request(11, "ping", json!({}))).await.unwrap();
        assert_eq!(pong.result, Some(json!({})));
        assert_eq!(server.in_flight_count(), 1);

        let notice = JsonRpcMessage::notification(
            "notifications/cancelled",
            json!({"requestId": 11}),
        );
        server.handle(notice).await;

        let response = waiting.await.unwrap().unwrap();
        let (body, _) = tool_body(&response);
        assert_eq!(body["kind"], "cancelled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_request_is_cancellable_before_it_runs() {
        let server = server(ScriptedEngine::with_statuses([JobStatus::Running]));
        let incoming = server
            .accept(json!({
                "jsonrpc": "2.0",
                "id": 12,
                "method": "tools/call",
                "params": {"name": "wait_for_completion", "arguments": {"prompt_id": "job-1"}}
            }))
            .ok()
            .unwrap();
        let Incoming::Request(pending) = incoming else {
            panic!("expected a request");
        };

        server.cancel_all();

        let response = server.run(pending).await;
        let (body, _) = tool_body(&response);
        assert_eq!(body["kind"], "cancelled");
    }
}
