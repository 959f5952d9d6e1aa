//! The two hosted agent presets.

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::tools::{Calculator, FindFactors, ToolRegistry};

use super::Agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum AgentKind {
    /// Arithmetic expression agent
    Calculator,
    /// Integer factorization agent
    Factor,
}

impl AgentKind {
    pub const ALL: [AgentKind; 2] = [AgentKind::Calculator, AgentKind::Factor];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Calculator => "Calculator Agent",
            Self::Factor => "Factor Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Calculator => "A calculator agent that can perform basic arithmetic operations.",
            Self::Factor => {
                "A factor agent that extracts numbers from input and returns all possible factors."
            }
        }
    }

    /// Port used when both agents are hosted together.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Calculator => 9000,
            Self::Factor => 9001,
        }
    }

    /// CLI value for the `agent` subcommand.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calculator => "calculator",
            Self::Factor => "factor",
        }
    }

    pub fn tools(&self) -> ToolRegistry {
        match self {
            Self::Calculator => ToolRegistry::new().with(Arc::new(Calculator)),
            Self::Factor => ToolRegistry::new().with(Arc::new(FindFactors)),
        }
    }

    /// Build the agent for this preset on top of `llm`.
    pub fn build(&self, config: &Config, llm: Arc<dyn LlmClient>) -> Agent {
        Agent::new(
            self.display_name(),
            self.description(),
            config.llm.model_id.clone(),
            llm,
            self.tools(),
        )
        .with_max_iterations(config.max_iterations)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
