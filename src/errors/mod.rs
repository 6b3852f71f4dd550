use std::fmt;
use thiserror::Error;

/// A credential that a configured agent needs but the environment lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCredential {
    /// Environment variable that should hold the secret, e.g. `ANTHROPIC_API_KEY`.
    pub variable: String,
    /// Agent role that required it (`builder` or `judge`).
    pub role: String,
    /// Model identifier the role is configured with.
    pub model: String,
}

impl fmt::Display for MissingCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (required by the {} agent, model '{}')",
            self.variable, self.role, self.model
        )
    }
}

/// Typed error hierarchy for colloquy.
///
/// Startup-fatal categories (`Config`, `UnknownModel`, `Credential`, `Store`) abort
/// the process before the dialogue loop starts. `Provider`, `RateLimit` and `Auth`
/// surface from model invocations and are absorbed by the turn executor.
/// `Persistence` always propagates. Internal/leaf functions can keep using
/// `anyhow::Result`; the `Internal` variant converts via `?`.
#[derive(Debug, Error)]
pub enum ColloquyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown model '{model}'{}", role_suffix(.role.as_deref()))]
    UnknownModel { model: String, role: Option<String> },

    #[error("Missing credentials: {}", join_missing(.missing))]
    Credential { missing: Vec<MissingCredential> },

    #[error("Memory store error: {0}")]
    Store(String),

    #[error("Provider error: {message}")]
    Provider { message: String, retryable: bool },

    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<u64> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to persist conversation: {0}")]
    Persistence(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn role_suffix(role: Option<&str>) -> String {
    role.map(|r| format!(" configured for the {r} agent"))
        .unwrap_or_default()
}

fn join_missing(missing: &[MissingCredential]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ColloquyError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::RateLimit { .. } | Self::Internal(_) => true,
            Self::Auth(_)
            | Self::Config(_)
            | Self::UnknownModel { .. }
            | Self::Credential { .. }
            | Self::Store(_)
            | Self::Persistence(_) => false,
        }
    }

    /// Whether this error must abort the process before the dialogue loop starts.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::UnknownModel { .. } | Self::Credential { .. } | Self::Store(_)
        )
    }
}
