use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

macro_rules! define_credentials {
    ($( $provider:literal => $env:literal );* $(;)?) => {
        /// (provider family, env var name) pairs.
        pub const CREDENTIAL_ENV_VARS: &[(&str, &str)] = &[$(($provider, $env)),*];

        /// Environment variable holding the secret for a canonical provider name.
        pub fn env_var_for(provider: &str) -> Option<&'static str> {
            match provider {
                $($provider => Some($env),)*
                _ => None,
            }
        }
    };
}

define_credentials! {
    "anthropic" => "ANTHROPIC_API_KEY";
    "openai"    => "OPENAI_API_KEY";
}

/// Where provider secrets are read from.
///
/// Production reads the process environment; tests use [`StaticCredentials`]
/// so they never have to mutate global env state.
pub trait CredentialSource: Send + Sync {
    /// Return the non-empty value of `variable`, if present.
    fn get(&self, variable: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, variable: &str) -> Option<String> {
        std::env::var(variable)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

/// Fixed in-memory credential table.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(variable.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, variable: &str) -> Option<String> {
        self.values
            .get(variable)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// Load a `.env` file from `dir` into the process environment.
///
/// Variables already set in the environment take precedence. A missing file
/// is not an error; a malformed one is logged and skipped.
pub fn load_dotenv(dir: &Path) -> bool {
    let path = dir.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => {
            debug!("loaded environment from {}", path.display());
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!("ignoring unreadable {}: {}", path.display(), e);
            false
        }
    }
}
