pub mod credentials;
pub mod loader;
pub mod schema;

pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use loader::{DEFAULT_CONFIG_FILE, get_config_path, load_config};
pub use schema::{
    AgentConfig, AgentRole, AgentsConfig, Config, DEFAULT_SEED_PROMPT, ModelConfig, ModelsConfig,
    ProviderConfig, ProvidersConfig, RetrySettings, SessionConfig, normalize_provider,
};
