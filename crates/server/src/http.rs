//! HTTP endpoints
//!
//! One listener, three session-scoped verbs on `/mcp` plus the public
//! probes. The session id travels in the `Mcp-Session-Id` header: POST
//! resolves-or-creates, GET opens the streaming leg for an existing session,
//! DELETE tears one down. Unknown ids on GET/DELETE are not-found responses,
//! distinct from anything tool-level.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures::Stream;
use serde_json::json;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::state::AppState;
use crate::ServerError;

/// Header carrying the logical session id, independent of the connection.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );

    Router::new()
        // Protocol surface: one path, session id in the header
        .route(
            "/mcp",
            get(open_stream).post(post_message).delete(delete_session),
        )
        // Probes
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns a permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000 for safety
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        if !origins.is_empty() {
            tracing::error!("All configured CORS origins are invalid, falling back to localhost");
        } else {
            tracing::info!("No CORS origins configured, defaulting to localhost:3000");
        }
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers([HeaderName::from_static(SESSION_HEADER)]);
    }

    tracing::info!("CORS configured with {} origins", parsed.len());
    // Credentials forbid wildcard headers, so name the ones the protocol uses.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(methods)
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            HeaderName::from_static(SESSION_HEADER),
        ])
        .expose_headers([HeaderName::from_static(SESSION_HEADER)])
        .allow_credentials(true)
}

fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

fn not_found(id: &str) -> Response {
    let err = ServerError::SessionNotFound(id.to_string());
    (
        StatusCode::from(&err),
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

/// Submit one protocol message.
///
/// An unknown or absent session id creates a fresh session; the id the
/// message was handled under is always echoed in the response header so
/// clients learn their session id from the first reply.
async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let response = JsonRpcResponse::failure(
                serde_json::Value::Null,
                PARSE_ERROR,
                format!("invalid JSON-RPC payload: {e}"),
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let (session, created) = match state.sessions.resolve(session_id_from(&headers)) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(error = %err, "session resolution failed");
            return (
                StatusCode::from(&err),
                Json(json!({ "error": err.to_string() })),
            )
                .into_response();
        }
    };
    if created {
        tracing::debug!(session_id = %session.id, method = %request.method, "new session for request");
    }
    session.touch();

    // Arrival order within the session; no ordering across sessions.
    let _ordered = session.serialize_dispatch().await;
    let reply = state.protocol.handle(&session, request).await;

    let mut response = match reply {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        // Notification: accepted, nothing to send back.
        None => StatusCode::ACCEPTED.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&session.id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Open (or resume) the streaming channel of an existing session.
async fn open_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, Response> {
    let Some(id) = session_id_from(&headers) else {
        return Err(not_found("<missing header>"));
    };
    let Some(session) = state.sessions.get(id) else {
        return Err(not_found(id));
    };

    session.touch();
    tracing::debug!(session_id = %id, "streaming channel opened");

    let stream = ReceiverStream::new(session.subscribe()).map(|event| {
        Ok::<_, std::convert::Infallible>(
            Event::default()
                .id(event.id.to_string())
                .event("message")
                .data(event.payload.to_string()),
        )
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Tear down a session. The id becomes unknown; it is never reused.
async fn delete_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id_from(&headers) else {
        return not_found("<missing header>");
    };
    if state.sessions.remove(id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(id)
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "sessions": state.sessions.count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_config::Settings;
    use frontdesk_core::StubRecordGateway;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(Settings::default(), Arc::new(StubRecordGateway::new()))
    }

    fn post(body: serde_json::Value, session: Option<&str>) -> axum::http::Request<axum::body::Body> {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json");
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder
            .body(axum::body::Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public_and_static() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn post_without_session_mints_one_and_echoes_the_header() {
        let router = create_router(test_state());
        let response = router
            .oneshot(post(
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "initialize",
                    "params": {"protocolVersion": "2024-11-05"}
                }),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert!(session_id.is_some_and(|id| !id.is_empty()));

        let body = body_json(response).await;
        assert_eq!(body["result"]["serverInfo"]["name"], "frontdesk");
    }

    #[tokio::test]
    async fn post_with_known_session_resumes_it() {
        let state = test_state();
        let router = create_router(state.clone());

        let first = router
            .clone()
            .oneshot(post(
                serde_json::json!({
                    "jsonrpc": "2.0", "id": 1, "method": "initialize",
                    "params": {"protocolVersion": "2024-11-05"}
                }),
                None,
            ))
            .await
            .unwrap();
        let id = first.headers()[SESSION_HEADER].to_str().unwrap().to_string();

        let second = router
            .oneshot(post(
                serde_json::json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
                Some(&id),
            ))
            .await
            .unwrap();

        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()[SESSION_HEADER].to_str().unwrap(), id);
        let body = body_json(second).await;
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 8);
        assert_eq!(state.sessions.count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_parse_error() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn notification_is_accepted_with_no_body() {
        let router = create_router(test_state());
        let response = router
            .oneshot(post(
                serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn get_and_delete_unknown_session_are_not_found() {
        let state = test_state();
        let router = create_router(state.clone());

        let get_response = router
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/mcp")
                    .header(SESSION_HEADER, "no-such-session")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(get_response.status(), StatusCode::NOT_FOUND);

        let delete_response = router
            .oneshot(
                axum::http::Request::builder()
                    .method("DELETE")
                    .uri("/mcp")
                    .header(SESSION_HEADER, "no-such-session")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(delete_response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_tears_down_and_the_id_is_gone() {
        let state = test_state();
        let router = create_router(state.clone());

        let first = router
            .clone()
            .oneshot(post(
                serde_json::json!({
                    "jsonrpc": "2.0", "id": 1, "method": "initialize",
                    "params": {"protocolVersion": "2024-11-05"}
                }),
                None,
            ))
            .await
            .unwrap();
        let id = first.headers()[SESSION_HEADER].to_str().unwrap().to_string();
        assert_eq!(state.sessions.count(), 1);

        let deleted = router
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("DELETE")
                    .uri("/mcp")
                    .header(SESSION_HEADER, &id)
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.sessions.count(), 0);

        // A POST bearing the dead id gets a brand-new session, not a revival.
        let revived = router
            .oneshot(post(
                serde_json::json!({
                    "jsonrpc": "2.0", "id": 3, "method": "initialize",
                    "params": {"protocolVersion": "2024-11-05"}
                }),
                Some(&id),
            ))
            .await
            .unwrap();
        let new_id = revived.headers()[SESSION_HEADER].to_str().unwrap();
        assert_ne!(new_id, id);
    }
}
