//! HTTP route definitions for a hosted agent.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use super::auth::require_bearer;
use super::card::{agent_url, build_agent_card, get_agent_card};
use super::rpc::handle_rpc;
use super::types::{AgentCard, HealthResponse};
use crate::agent::Agent;
use crate::config::{Config, AGENT_CARD_PATH};
use crate::supervisor::{announce_ready, shutdown_signal};

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    pub agent: Arc<Agent>,
    pub card: AgentCard,
}

impl AppState {
    pub fn new(config: Arc<Config>, agent: Agent, port: u16) -> Self {
        let card = build_agent_card(&agent, agent_url(&config.host, port));
        Self {
            config,
            agent: Arc::new(agent),
            card,
        }
    }
}

/// Build the router with the auth gate wrapped around every route.
pub fn router(state: Arc<AppState>) -> Router {
    let auth = Arc::new(state.config.auth.clone());

    Router::new()
        .route(AGENT_CARD_PATH, get(get_agent_card))
        .route("/", post(handle_rpc))
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn_with_state(auth, require_bearer))
        .layer(TraceLayer::new_for_http())
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Bind `host:port`, report readiness and serve until ctrl-c or SIGTERM.
pub async fn serve(config: Arc<Config>, agent: Agent, port: u16) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let local: SocketAddr = listener.local_addr()?;

    let name = agent.name().to_string();
    let state = Arc::new(AppState::new(config, agent, port));

    tracing::info!("[{}] Listening on http://{}", name, local);
    tracing::info!(
        "[{}] Agent card: http://{}:{}{}",
        name,
        state.config.host,
        port,
        AGENT_CARD_PATH
    );
    announce_ready(local)?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[{}] Stopped", name);
    Ok(())
}
