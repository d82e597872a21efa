//! frontdesk server binary

use std::sync::Arc;

use anyhow::Context;
use frontdesk_config::load_settings;
use frontdesk_core::{RecordGateway, StubRecordGateway};
use frontdesk_crm::SalesforceClient;
use frontdesk_server::{auth_middleware, create_router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let env = std::env::var("FRONTDESK_ENV").ok();
    let settings = load_settings(env.as_deref()).context("loading settings")?;
    tracing::info!(environment = ?settings.environment, "settings loaded");

    let gateway: Arc<dyn RecordGateway> = if settings.salesforce.is_configured() {
        Arc::new(
            SalesforceClient::from_config(settings.salesforce.clone())
                .context("building Salesforce client")?,
        )
    } else {
        // Strict environments refuse to start unconfigured at validation
        // time, so this branch only ever runs in development.
        tracing::warn!("Salesforce credentials not configured; using the in-memory stub gateway");
        Arc::new(StubRecordGateway::new())
    };

    let state = AppState::new(settings, gateway);
    let sweeper = state.sessions.start_cleanup_task();

    let app = create_router(state.clone()).layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "frontdesk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = sweeper.send(true);
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
