//! Tool Agents - entry point
//!
//! `tool-agents serve` hosts every agent, one child process each.
//! `tool-agents agent <kind>` runs a single agent in the foreground.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tool_agents::{
    agent::AgentKind,
    api::types::PROTOCOL_VERSION,
    config::Config,
    supervisor::{AgentSpec, Supervisor},
};
use tracing::info;

#[derive(Parser)]
#[command(name = "tool-agents", version, about = "Calculator and factor agents over A2A")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every agent, each in its own process (default)
    Serve {
        #[arg(long, default_value_t = 9000)]
        calculator_port: u16,

        #[arg(long, default_value_t = 9001)]
        factor_port: u16,

        /// Seconds to wait for each agent to report it is listening
        #[arg(long, default_value_t = 30)]
        ready_timeout_secs: u64,
    },

    /// Run a single agent in this process
    Agent {
        #[arg(value_enum)]
        kind: AgentKind,

        /// Listen port (defaults to the agent's usual port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tool_agents::init_tracing();
    let cli = Cli::parse();

    // Fail before anything is bound or spawned.
    let config = Arc::new(Config::from_env()?);
    info!(
        "tool-agents {} (A2A protocol {})",
        env!("CARGO_PKG_VERSION"),
        PROTOCOL_VERSION
    );

    match cli.command.unwrap_or(Command::Serve {
        calculator_port: AgentKind::Calculator.default_port(),
        factor_port: AgentKind::Factor.default_port(),
        ready_timeout_secs: 30,
    }) {
        Command::Serve {
            calculator_port,
            factor_port,
            ready_timeout_secs,
        } => {
            let specs = [
                AgentSpec {
                    kind: AgentKind::Calculator,
                    port: calculator_port,
                },
                AgentSpec {
                    kind: AgentKind::Factor,
                    port: factor_port,
                },
            ];

            let mut supervisor = Supervisor::current_exe()?
                .with_ready_timeout(Duration::from_secs(ready_timeout_secs));
            supervisor.start_all(&specs).await?;

            info!("All agents are running. Press Ctrl+C to stop.");
            supervisor.run_until_shutdown().await;
        }
        Command::Agent { kind, port } => {
            let port = port.unwrap_or_else(|| kind.default_port());
            tool_agents::run_agent(config, kind, port).await?;
        }
    }

    Ok(())
}
