//! Frontdesk gateway server
//!
//! One HTTP listener multiplexing many logical protocol sessions: POST
//! submits a message for a session, GET opens its streaming channel, DELETE
//! tears it down. Sessions are addressable by an opaque id independent of the
//! underlying connection, so clients can reconnect and resume.

pub mod auth;
pub mod http;
pub mod protocol;
pub mod session;
pub mod state;

pub use auth::auth_middleware;
pub use http::{create_router, SESSION_HEADER};
pub use protocol::ProtocolHandler;
pub use session::{Session, SessionManager};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session limit reached")]
    Capacity,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<&ServerError> for axum::http::StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::SessionNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::Capacity => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
