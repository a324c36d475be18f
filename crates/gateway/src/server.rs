use std::{net::SocketAddr, time::Duration};

use {
    axum::{
        Router,
        http::StatusCode,
        routing::{get, post},
    },
    parley_config::ParleyConfig,
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
    tracing::{info, warn},
};

use crate::{
    state::GatewayState,
    webhook::{health_handler, webhook_handler},
};

/// Build the gateway router (shared between production startup and tests).
///
/// `request_timeout` bounds a whole webhook request, retries and fallbacks
/// included. `None` installs no timeout.
pub fn build_app(state: GatewayState, request_timeout: Option<Duration>) -> Router {
    let router = Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler));
    let router = match request_timeout {
        Some(timeout) => {
            router.layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        },
        None => router,
    };
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Start the gateway and serve until Ctrl-C.
pub async fn start_gateway(config: ParleyConfig) -> anyhow::Result<()> {
    let state = GatewayState::from_config(&config)?;
    let memory = state.memory().clone();
    let app = build_app(state, config.server.request_timeout());

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        backends = config.backends.len(),
        request_timeout_secs = config.server.request_timeout_secs,
        "parley gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    memory.clear();
    info!("parley gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
        return;
    }
    info!("shutdown requested");
}
