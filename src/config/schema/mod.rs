use crate::errors::ColloquyError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

mod agent;
mod providers;

pub use agent::*;
pub use providers::*;

/// Opening message used when the conversation log is empty.
pub const DEFAULT_SEED_PROMPT: &str = "Let\u{2019}s build a website together. What\u{2019}s the best way to start?";

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

fn default_memory_path() -> PathBuf {
    PathBuf::from("memory/history.json")
}

fn default_turn_delay_ms() -> u64 {
    500
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries", rename = "maxRetries")]
    pub max_retries: usize,
    #[serde(default = "default_initial_delay_ms", rename = "initialDelayMs")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms", rename = "maxDelayMs")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Conversation log location. Relative paths resolve against the
    /// directory holding the configuration file.
    #[serde(default = "default_memory_path", rename = "memoryPath")]
    pub memory_path: PathBuf,
    /// Pause between the Builder and Judge turns.
    #[serde(default = "default_turn_delay_ms", rename = "turnDelayMs")]
    pub turn_delay_ms: u64,
    #[serde(default, rename = "seedPrompt", skip_serializing_if = "Option::is_none")]
    pub seed_prompt: Option<String>,
    /// When set, an unanswered follow-up prompt counts as "continue" after this many seconds.
    #[serde(default, rename = "idleTimeoutSecs", skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            memory_path: default_memory_path(),
            turn_delay_ms: default_turn_delay_ms(),
            seed_prompt: None,
            idle_timeout_secs: None,
            retry: RetrySettings::default(),
        }
    }
}

impl SessionConfig {
    pub fn seed_prompt(&self) -> &str {
        self.seed_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SEED_PROMPT)
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub agents: AgentsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    pub fn new(agents: AgentsConfig) -> Self {
        Self {
            agents,
            models: ModelsConfig::new(),
            providers: ProvidersConfig::default(),
            session: SessionConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ColloquyError> {
        self.validate_agents()?;
        self.validate_models()?;
        self.validate_session()?;
        Ok(())
    }

    fn validate_agents(&self) -> Result<(), ColloquyError> {
        for (role, agent) in self.agents.iter() {
            if agent.model.trim().is_empty() {
                return Err(ColloquyError::Config(format!(
                    "agents.{role}.model must not be empty"
                )));
            }
            if agent.persona.trim().is_empty() {
                return Err(ColloquyError::Config(format!(
                    "agents.{role}.persona must not be empty"
                )));
            }
            if agent.role_prompt.trim().is_empty() {
                warn!("agents.{role}.rolePrompt is empty; the model will run without a system instruction");
            }
        }
        Ok(())
    }

    fn validate_models(&self) -> Result<(), ColloquyError> {
        for (name, model) in &self.models {
            let provider = normalize_provider(&model.provider);
            if !matches!(provider.as_ref(), "anthropic" | "openai") {
                return Err(ColloquyError::Config(format!(
                    "models.{name}.provider '{}' is not supported (expected anthropic or openai)",
                    model.provider
                )));
            }
            if model.model.trim().is_empty() {
                return Err(ColloquyError::Config(format!(
                    "models.{name}.model must not be empty"
                )));
            }
            if let Some(t) = model.temperature
                && (t.is_nan() || t.is_infinite() || !(0.0..=2.0).contains(&t))
            {
                return Err(ColloquyError::Config(format!(
                    "models.{name}.temperature must be a finite number between 0.0 and 2.0"
                )));
            }
            if let Some(max) = model.max_tokens {
                if max == 0 {
                    return Err(ColloquyError::Config(format!(
                        "models.{name}.maxTokens must be > 0"
                    )));
                }
                if max > 1_000_000 {
                    return Err(ColloquyError::Config(format!(
                        "models.{name}.maxTokens is unreasonably large (> 1,000,000)"
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ColloquyError> {
        let s = &self.session;
        if s.memory_path.as_os_str().is_empty() {
            return Err(ColloquyError::Config(
                "session.memoryPath must not be empty".into(),
            ));
        }
        if s.turn_delay_ms > 60_000 {
            warn!("session.turnDelayMs is over a minute; rounds will be slow");
        }
        if s.idle_timeout_secs == Some(0) {
            return Err(ColloquyError::Config(
                "session.idleTimeoutSecs must be > 0 when set".into(),
            ));
        }
        if s.retry.max_retries > 10 {
            return Err(ColloquyError::Config(
                "session.retry.maxRetries is unreasonably large (> 10)".into(),
            ));
        }
        if s.retry.initial_delay_ms > s.retry.max_delay_ms {
            return Err(ColloquyError::Config(
                "session.retry.initialDelayMs must not exceed maxDelayMs".into(),
            ));
        }
        Ok(())
    }
}
