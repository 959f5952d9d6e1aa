//! Configuration management for the tool agents.
//!
//! Configuration is read once at process start via environment variables:
//! - `API_PASSWORD` - Required. Shared secret clients present as `Bearer <secret>`.
//! - `API_HOST` - Optional. Bind host. Defaults to `0.0.0.0`.
//! - `LLM_SERVICE_ENDPOINT` - Optional. LiteLLM router URL. Defaults to `https://lite-llm.mymaas.net`.
//! - `LLM_SERVICE_API_KEY` - Required. API key for the LiteLLM router.
//! - `LLM_MODEL_ID` - Optional. Model id in LiteLLM format. Defaults to `openai/vertex-claude-4-5-sonnet`.
//! - `LLM_TIMEOUT_SECS` - Optional. Per-request timeout for the router. Defaults to `300`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `20`.
//! - `AUTH_EXEMPT_PATHS` - Optional. Comma-separated extra paths served without auth.

use std::time::Duration;

use thiserror::Error;

/// Path of the A2A agent card. Always served without authentication.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://lite-llm.mymaas.net";
pub const DEFAULT_MODEL_ID: &str = "openai/vertex-claude-4-5-sonnet";
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Bearer authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared secret expected after `Bearer `.
    pub api_password: String,

    /// Request paths forwarded without checking credentials.
    pub exempt_paths: Vec<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_password", &"[redacted]")
            .field("exempt_paths", &self.exempt_paths)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(api_password: impl Into<String>) -> Self {
        Self {
            api_password: api_password.into(),
            exempt_paths: vec![AGENT_CARD_PATH.to_string()],
        }
    }

    /// Whether `path` bypasses the credential check.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    /// The exact `Authorization` header value accepted by the gate.
    pub fn expected_header(&self) -> String {
        format!("Bearer {}", self.api_password)
    }
}

/// Upstream model router configuration.
#[derive(Clone)]
pub struct LlmConfig {
    /// Base URL of the LiteLLM (OpenAI-compatible) router
    pub endpoint: String,

    /// API key for the router
    pub api_key: String,

    /// Model identifier in LiteLLM `provider/model` format
    pub model_id: String,

    /// Upper bound on one completion request, connect to last byte
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[redacted]")
            .field("model_id", &self.model_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Process-wide configuration, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host for agent servers
    pub host: String,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,

    /// Bearer auth configuration
    pub auth: AuthConfig,

    /// Upstream model configuration
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `API_PASSWORD` or
    /// `LLM_SERVICE_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_password = lookup("API_PASSWORD")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("API_PASSWORD".to_string()))?;

        let host = lookup("API_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let endpoint =
            lookup("LLM_SERVICE_ENDPOINT").unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string());

        let api_key = lookup("LLM_SERVICE_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("LLM_SERVICE_API_KEY".to_string()))?;

        let model_id = lookup("LLM_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        let timeout = match lookup("LLM_TIMEOUT_SECS") {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::InvalidValue(
                        "LLM_TIMEOUT_SECS".to_string(),
                        "must be at least 1".to_string(),
                    ))
                }
                Err(e) => {
                    return Err(ConfigError::InvalidValue(
                        "LLM_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    ))
                }
            },
            None => DEFAULT_LLM_TIMEOUT,
        };

        let max_iterations = match lookup("MAX_ITERATIONS") {
            Some(v) => v.trim().parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e))
            })?,
            None => DEFAULT_MAX_ITERATIONS,
        };
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let mut auth = AuthConfig::new(api_password);
        if let Some(extra) = lookup("AUTH_EXEMPT_PATHS") {
            auth.exempt_paths.extend(parse_path_list(&extra));
        }

        Ok(Self {
            host,
            max_iterations,
            auth,
            llm: LlmConfig {
                endpoint,
                api_key,
                model_id,
                timeout,
            },
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_password: String, llm_endpoint: String, llm_api_key: String) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            auth: AuthConfig::new(api_password),
            llm: LlmConfig {
                endpoint: llm_endpoint,
                api_key: llm_api_key,
                model_id: DEFAULT_MODEL_ID.to_string(),
                timeout: DEFAULT_LLM_TIMEOUT,
            },
        }
    }
}

fn parse_path_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('/') {
                p.to_string()
            } else {
                format!("/{}", p)
            }
        })
        .collect()
}
