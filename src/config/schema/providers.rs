use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Per-provider connection overrides. Secrets never live here; they come
/// from the process environment (see `config::credentials`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default, rename = "apiBase", skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, provider: &str) -> Option<&ProviderConfig> {
        match normalize_provider(provider).as_ref() {
            "anthropic" => Some(&self.anthropic),
            "openai" => Some(&self.openai),
            _ => None,
        }
    }
}

/// A user-declared model alias, e.g. `"fast": {"provider": "openai", "model": "gpt-4o-mini"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Model aliases keyed by identifier. Ordered so listings are stable.
pub type ModelsConfig = BTreeMap<String, ModelConfig>;

pub fn normalize_provider(provider: &str) -> Cow<'_, str> {
    match provider.to_lowercase().as_str() {
        "claude" | "anthropic" => Cow::Borrowed("anthropic"),
        "gpt" | "chatgpt" | "openai" => Cow::Borrowed("openai"),
        _ => Cow::Owned(provider.to_lowercase()),
    }
}
