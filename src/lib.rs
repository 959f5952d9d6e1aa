//! # Tool Agents
//!
//! Two small tool-using agents, each served over its own authenticated
//! A2A endpoint:
//!
//! - **Calculator Agent** evaluates arithmetic expressions
//! - **Factor Agent** pulls the first integer out of free text and lists
//!   its divisors
//!
//! ## Architecture
//!
//! Each agent follows the "tools in a loop" pattern:
//! 1. Receive a `message/send` call on the A2A JSON-RPC endpoint
//! 2. Build context with system prompt and available tools
//! 3. Call the LiteLLM proxy, execute any tool calls
//! 4. Feed results back to the model, repeat until it answers
//!
//! `tool-agents serve` runs every agent as its own child process and
//! stops them together on ctrl-c or SIGTERM.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tool_agents::{agent::AgentKind, config::Config};
//!
//! let config = Arc::new(Config::from_env()?);
//! tool_agents::run_agent(config, AgentKind::Factor, 9001).await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod supervisor;
pub mod tools;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::Config;

use agent::AgentKind;
use llm::LiteLlmClient;

/// Install the global subscriber. Logs go to stderr; stdout is reserved
/// for the readiness line.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_agents=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Serve one agent on `port` until shutdown.
pub async fn run_agent(config: Arc<Config>, kind: AgentKind, port: u16) -> anyhow::Result<()> {
    let llm = Arc::new(LiteLlmClient::from_config(&config.llm)?);
    let agent = kind.build(&config, llm);
    tracing::info!(
        "Starting {} (model={}, max_iterations={})",
        agent.name(),
        config.llm.model_id,
        config.max_iterations
    );
    api::serve(config, agent, port).await
}
