//! Configuration loading from tiller.toml.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Agent loop configuration.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Provider name (currently only "ollama" supported).
    #[serde(default = "default_provider")]
    #[allow(dead_code)]
    pub provider: String,

    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama server base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deadline for each model call, in seconds.
    pub model_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            model_timeout_secs: None,
        }
    }
}

/// Agent loop configuration.
#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// System instruction prepended to every model call.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Deadline for each individual tool invocation, in seconds.
    pub tool_timeout_secs: Option<u64>,

    /// Maximum model calls per run; unbounded when absent.
    pub max_turns: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            tool_timeout_secs: None,
            max_turns: None,
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_system_prompt() -> String {
    "You are Tiller, a helpful assistant. Answer the question using the tools available to you."
        .to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Effective model, honoring the `TILLER_MODEL` environment override.
    pub fn model(&self) -> String {
        std::env::var("TILLER_MODEL").unwrap_or_else(|_| self.backend.model.clone())
    }

    /// Effective base URL, honoring the `OLLAMA_HOST` environment override.
    pub fn base_url(&self) -> String {
        std::env::var("OLLAMA_HOST").unwrap_or_else(|_| self.backend.base_url.clone())
    }

    pub fn model_timeout(&self) -> Option<Duration> {
        self.backend.model_timeout_secs.map(Duration::from_secs)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.agent.tool_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
