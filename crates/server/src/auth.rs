//! Authentication middleware
//!
//! Optional API key authentication for the protocol surface. Bearer token in
//! the Authorization header; probe paths stay public so orchestration keeps
//! working when auth is on.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Warn only once when auth is disabled.
static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

enum AuthCheck {
    /// Authentication disabled, pass through
    Disabled,
    /// Path is public, pass through
    PublicPath,
    /// Config error
    ConfigError(&'static str),
    /// Need to check the bearer key against this expected value
    CheckKey(String),
}

fn check_auth_config(state: &AppState, path: &str) -> AuthCheck {
    let auth = &state.settings.server.auth;

    if !auth.enabled {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "API authentication is DISABLED. Set FRONTDESK__SERVER__AUTH__ENABLED=true for production."
            );
        }
        return AuthCheck::Disabled;
    }

    if auth.public_paths.iter().any(|p| path.starts_with(p)) {
        return AuthCheck::PublicPath;
    }

    match &auth.api_key {
        Some(key) if !key.is_empty() => AuthCheck::CheckKey(key.clone()),
        _ => AuthCheck::ConfigError("Auth is enabled but no API key is configured"),
    }
}

/// Middleware enforcing `Authorization: Bearer <api_key>` outside public
/// paths.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match check_auth_config(&state, &path) {
        AuthCheck::Disabled | AuthCheck::PublicPath => next.run(request).await,
        AuthCheck::ConfigError(msg) => {
            tracing::error!("{}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server authentication not configured",
            )
                .into_response()
        }
        AuthCheck::CheckKey(expected_key) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            match auth_header {
                Some(header) if header.starts_with("Bearer ") => {
                    let provided_key = &header[7..];

                    if constant_time_compare(provided_key.as_bytes(), expected_key.as_bytes()) {
                        next.run(request).await
                    } else {
                        tracing::warn!("Invalid API key presented");
                        (StatusCode::UNAUTHORIZED, "Invalid API key").into_response()
                    }
                }
                Some(_) => (
                    StatusCode::BAD_REQUEST,
                    "Invalid Authorization header format. Expected: Bearer <token>",
                )
                    .into_response(),
                None => {
                    (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response()
                }
            }
        }
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_compare_matches_equality() {
        assert!(constant_time_compare(b"frontdesk-key", b"frontdesk-key"));
        assert!(!constant_time_compare(b"frontdesk-key", b"frontdesk-ke"));
        assert!(!constant_time_compare(b"frontdesk-key", b"frontdesk-keY"));
        assert!(!constant_time_compare(b"abc", b"xyz"));
    }
}
