//! Application state
//!
//! Shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use frontdesk_config::Settings;
use frontdesk_core::RecordGateway;
use frontdesk_tools::standard_registry;

use crate::protocol::ProtocolHandler;
use crate::session::SessionManager;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Session registry; the sole authority on the id → session mapping.
    pub sessions: Arc<SessionManager>,
    pub protocol: Arc<ProtocolHandler>,
}

impl AppState {
    /// Wire the state from settings and a record gateway.
    pub fn new(settings: Settings, gateway: Arc<dyn RecordGateway>) -> Self {
        let registry = standard_registry(
            gateway,
            settings.scheduling.clone(),
            settings.crm_defaults.clone(),
        );
        let sessions = SessionManager::with_config(
            settings.server.max_sessions,
            Duration::from_secs(settings.server.session_timeout_secs),
            Duration::from_secs(60),
        );

        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(sessions),
            protocol: Arc::new(ProtocolHandler::new(Arc::new(registry))),
        }
    }
}
