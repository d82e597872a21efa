//! JSON-RPC / MCP protocol handling
//!
//! Decodes protocol messages and dispatches them in the context of one
//! session. Tool failures become `isError` results, never JSON-RPC faults:
//! only malformed requests, unknown methods, and use-before-initialize are
//! protocol errors.

use std::sync::Arc;

use frontdesk_tools::{ToolExecutor, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::session::Session;

/// Protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
/// Request arrived before the session completed `initialize`.
pub const NOT_INITIALIZED: i64 = -32002;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    /// Absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
            result: None,
        }
    }

    #[cfg(test)]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    #[cfg(test)]
    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// Per-message dispatcher, shared across sessions.
///
/// Stateless by construction: everything conversation-scoped is read from
/// and written to the `Session` it is handed, so no state can leak between
/// sessions.
pub struct ProtocolHandler {
    tools: Arc<ToolRegistry>,
}

impl ProtocolHandler {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    /// Handle one decoded message in `session`'s context.
    ///
    /// Returns `None` for notifications (nothing to send back).
    pub async fn handle(&self, session: &Session, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.handle_notification(session, &request);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if !session.is_initialized() && !matches!(request.method.as_str(), "initialize" | "ping") {
            return Some(JsonRpcResponse::failure(
                id,
                NOT_INITIALIZED,
                "session not initialized",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.initialize(session, request.params.as_ref(), id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(session, request.params.as_ref(), id).await,
            other => {
                tracing::debug!(method = other, "unknown method");
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("unknown method: {other}"))
            }
        };
        Some(response)
    }

    fn handle_notification(&self, session: &Session, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => {
                tracing::debug!(session_id = %session.id, "client reports initialized");
            }
            other => {
                tracing::debug!(method = other, "ignoring notification");
            }
        }
    }

    fn initialize(&self, session: &Session, params: Option<&Value>, id: Value) -> JsonRpcResponse {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(|v| v.as_str())
            .unwrap_or(PROTOCOL_VERSION);

        // Echo a version we support, preferring the client's ask.
        let negotiated = if requested == PROTOCOL_VERSION {
            requested
        } else {
            PROTOCOL_VERSION
        };
        session.mark_initialized(negotiated.to_string());
        tracing::info!(session_id = %session.id, version = negotiated, "session initialized");

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": negotiated,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": "frontdesk",
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "instructions": "Front-desk CRM gateway: look up contacts and leads by \
                 phone, create records, and book appointments within business hours.",
            }),
        )
    }

    fn list_tools(&self, id: Value) -> JsonRpcResponse {
        let tools = self.tools.list_tools();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn call_tool(&self, session: &Session, params: Option<&Value>, id: Value) -> JsonRpcResponse {
        let Some(name) = params
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
        else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "tools/call requires a tool name");
        };
        let arguments = params
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        tracing::debug!(session_id = %session.id, tool = name, "tool call");

        // Strict boundary: any handler failure becomes a structured isError
        // result. Nothing from the tool layer can fault the session.
        match self.tools.execute(name, arguments).await {
            Ok(output) => JsonRpcResponse::success(
                id,
                json!({
                    "content": output.content,
                    "isError": output.is_error,
                }),
            ),
            Err(err) => {
                tracing::warn!(session_id = %session.id, tool = name, error = %err, "tool failed");
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": err.to_string() }],
                        "isError": true,
                    }),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_config::{CrmDefaults, SchedulingConfig};
    use frontdesk_core::{GatewayError, StubRecordGateway};
    use frontdesk_tools::standard_registry;
    use crate::session::SessionManager;

    fn handler_with(stub: Arc<StubRecordGateway>) -> ProtocolHandler {
        ProtocolHandler::new(Arc::new(standard_registry(
            stub,
            SchedulingConfig::default(),
            CrmDefaults::default(),
        )))
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    async fn initialized_session(
        handler: &ProtocolHandler,
        manager: &SessionManager,
    ) -> Arc<Session> {
        let (session, _) = manager.resolve(None).unwrap();
        handler
            .handle(&session, request("initialize", json!({"protocolVersion": PROTOCOL_VERSION})))
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn initialize_negotiates_and_marks_the_session() {
        let handler = handler_with(Arc::new(StubRecordGateway::new()));
        let manager = SessionManager::new(10);
        let (session, _) = manager.resolve(None).unwrap();

        let response = handler
            .handle(&session, request("initialize", json!({"protocolVersion": "2024-11-05"})))
            .await
            .unwrap();

        let result = response.result().unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "frontdesk");
        assert!(session.is_initialized());
    }

    #[tokio::test]
    async fn requests_before_initialize_are_rejected() {
        let handler = handler_with(Arc::new(StubRecordGateway::new()));
        let manager = SessionManager::new(10);
        let (session, _) = manager.resolve(None).unwrap();

        let response = handler
            .handle(&session, request("tools/list", json!({})))
            .await
            .unwrap();
        assert_eq!(response.error_code(), Some(NOT_INITIALIZED));
    }

    #[tokio::test]
    async fn tools_list_exposes_all_eight_tools() {
        let handler = handler_with(Arc::new(StubRecordGateway::new()));
        let manager = SessionManager::new(10);
        let session = initialized_session(&handler, &manager).await;

        let response = handler
            .handle(&session, request("tools/list", json!({})))
            .await
            .unwrap();

        let tools = response.result().unwrap()["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 8);
        assert!(tools
            .iter()
            .any(|t| t["name"] == "search_contact_by_phone"));
        assert!(tools
            .iter()
            .all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn unknown_method_is_a_protocol_error() {
        let handler = handler_with(Arc::new(StubRecordGateway::new()));
        let manager = SessionManager::new(10);
        let session = initialized_session(&handler, &manager).await;

        let response = handler
            .handle(&session, request("resources/list", json!({})))
            .await
            .unwrap();
        assert_eq!(response.error_code(), Some(METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let handler = handler_with(Arc::new(StubRecordGateway::new()));
        let manager = SessionManager::new(10);
        let session = initialized_session(&handler, &manager).await;

        let notification = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(handler.handle(&session, notification).await.is_none());
    }

    #[tokio::test]
    async fn tool_validation_failure_is_an_is_error_result() {
        let stub = Arc::new(StubRecordGateway::new());
        let handler = handler_with(stub.clone());
        let manager = SessionManager::new(10);
        let session = initialized_session(&handler, &manager).await;

        let response = handler
            .handle(
                &session,
                request("tools/call", json!({"name": "create_contact", "arguments": {}})),
            )
            .await
            .unwrap();

        let result = response.result().unwrap();
        assert_eq!(result["isError"], true);
        // Validation failed before any gateway call was made.
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn gateway_fault_becomes_structured_error_not_a_crash() {
        let stub = Arc::new(StubRecordGateway::failing(GatewayError::Auth(
            "invalid_grant: expired assertion".into(),
        )));
        let handler = handler_with(stub);
        let manager = SessionManager::new(10);
        let session = initialized_session(&handler, &manager).await;

        let response = handler
            .handle(
                &session,
                request(
                    "tools/call",
                    json!({"name": "search_contact_by_phone", "arguments": {"phone": "555-123-4567"}}),
                ),
            )
            .await
            .unwrap();

        let result = response.result().unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("authentication"));
        // The session survives and keeps serving.
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn missing_tool_name_is_invalid_params() {
        let handler = handler_with(Arc::new(StubRecordGateway::new()));
        let manager = SessionManager::new(10);
        let session = initialized_session(&handler, &manager).await;

        let response = handler
            .handle(&session, request("tools/call", json!({"arguments": {}})))
            .await
            .unwrap();
        assert_eq!(response.error_code(), Some(INVALID_PARAMS));
    }
}
