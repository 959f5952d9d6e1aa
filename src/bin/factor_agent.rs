//! Standalone Factor Agent.

use std::sync::Arc;

use clap::Parser;
use tool_agents::{agent::AgentKind, api::types::PROTOCOL_VERSION, config::Config};

#[derive(Parser)]
#[command(name = "factor-agent", version, about = "Factor agent over A2A")]
struct Args {
    /// Listen port
    #[arg(short, long, default_value_t = 9001)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tool_agents::init_tracing();
    let args = Args::parse();

    let config = Arc::new(Config::from_env()?);
    tracing::info!(
        "factor-agent {} (A2A protocol {})",
        env!("CARGO_PKG_VERSION"),
        PROTOCOL_VERSION
    );
    tool_agents::run_agent(config, AgentKind::Factor, args.port).await
}
