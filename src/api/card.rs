//! Agent card served at `/.well-known/agent-card.json`.

use std::sync::Arc;

use axum::{extract::State, Json};

use super::routes::AppState;
use super::types::{AgentCapabilities, AgentCard, AgentSkill, PROTOCOL_VERSION};
use crate::agent::Agent;

/// Describe `agent` as reachable at `url`.
pub fn build_agent_card(agent: &Agent, url: String) -> AgentCard {
    let skills = agent
        .tools()
        .list_tools()
        .into_iter()
        .map(|t| AgentSkill {
            id: t.name.clone(),
            name: t.name,
            description: t.description,
            tags: Vec::new(),
        })
        .collect();

    AgentCard {
        name: agent.name().to_string(),
        description: agent.description().to_string(),
        url,
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        preferred_transport: "JSONRPC".to_string(),
        capabilities: AgentCapabilities::default(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        skills,
    }
}

/// Public URL of an agent bound to `host:port`.
pub fn agent_url(host: &str, port: u16) -> String {
    format!("http://{}:{}/", host, port)
}

/// GET /.well-known/agent-card.json
pub async fn get_agent_card(State(state): State<Arc<AppState>>) -> Json<AgentCard> {
    Json(state.card.clone())
}
