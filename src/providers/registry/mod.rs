use crate::config::credentials::{CredentialSource, env_var_for};
use crate::config::{AgentsConfig, Config, ModelConfig, ProvidersConfig, normalize_provider};
use crate::errors::{ColloquyError, MissingCredential};
use crate::providers::anthropic::AnthropicProvider;
use crate::providers::base::{ChatRequest, LLMProvider, Message, ProviderMetrics, RetryConfig};
use crate::providers::openai::OpenAIProvider;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Provider families with a client implementation.
const KNOWN_PROVIDERS: &[&str] = &["anthropic", "openai"];

// ---------------------------------------------------------------------------
// Model reference parser
// ---------------------------------------------------------------------------

/// Parsed model reference: optional provider prefix + bare model name.
pub struct ModelRef<'a> {
    pub provider: Option<&'a str>,
    pub model: &'a str,
}

/// Parse `"provider/model"` notation. Returns `provider=None` if there is no
/// slash or if the part before the slash isn't a recognized provider prefix.
pub fn parse_model_ref(raw: &str) -> ModelRef<'_> {
    if let Some(idx) = raw.find('/') {
        let candidate = &raw[..idx];
        let normalized = normalize_provider(candidate);
        if KNOWN_PROVIDERS.contains(&normalized.as_ref()) && idx + 1 < raw.len() {
            return ModelRef {
                provider: Some(candidate),
                model: &raw[idx + 1..],
            };
        }
    }
    ModelRef {
        provider: None,
        model: raw,
    }
}

/// Infer the provider from a bare model name using `starts_with` patterns.
/// Returns `None` for unrecognized names.
pub fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    let m = model.to_lowercase();
    if m.starts_with("claude-") || m.starts_with("claude_") {
        return Some("anthropic");
    }
    if m.starts_with("gpt-") || m.starts_with("o1") || m.starts_with("o3") || m.starts_with("o4") {
        return Some("openai");
    }
    None
}

// ---------------------------------------------------------------------------
// Model specs and capabilities
// ---------------------------------------------------------------------------

/// Concrete invocation parameters behind a symbolic model identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Canonical provider family (`anthropic` or `openai`).
    pub provider: String,
    /// Provider-side model name.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelSpec {
    pub fn new(provider: &str, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider: normalize_provider(provider).into_owned(),
            model: model.into(),
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    fn from_config(config: &ModelConfig) -> Self {
        Self {
            provider: normalize_provider(&config.provider).into_owned(),
            model: config.model.clone(),
            temperature: config.temperature.unwrap_or(0.0),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    /// Secret the provider needs, e.g. `OPENAI_API_KEY`.
    pub fn credential_var(&self) -> Option<&'static str> {
        env_var_for(&self.provider)
    }
}

/// A resolved model: provider client plus fixed sampling parameters.
pub struct Capability {
    provider: Arc<dyn LLMProvider>,
    spec: ModelSpec,
    retry: RetryConfig,
}

impl Capability {
    pub fn new(provider: Arc<dyn LLMProvider>, spec: ModelSpec, retry: RetryConfig) -> Self {
        Self {
            provider,
            spec,
            retry,
        }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Request, token and error counts accumulated by the provider client.
    pub fn metrics(&self) -> ProviderMetrics {
        self.provider.metrics()
    }

    /// Send `messages` to the model and return its text reply.
    ///
    /// Transient failures are retried per the capability's [`RetryConfig`].
    /// A reply without text content is reported as a provider error.
    pub async fn invoke(&self, messages: Vec<Message>) -> Result<String, ColloquyError> {
        let req = ChatRequest {
            messages,
            model: Some(&self.spec.model),
            max_tokens: self.spec.max_tokens,
            temperature: self.spec.temperature,
        };
        let response = self
            .provider
            .chat_with_retry(req, Some(self.retry.clone()))
            .await
            .map_err(|e| match e.downcast::<ColloquyError>() {
                Ok(typed) => typed,
                Err(other) => ColloquyError::Provider {
                    message: format!("{other:#}"),
                    retryable: false,
                },
            })?;

        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ColloquyError::Provider {
                message: format!("{} returned an empty response", self.spec.model),
                retryable: false,
            }),
        }
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("spec", &self.spec)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps model identifiers to [`ModelSpec`]s and builds [`Capability`]s.
///
/// Resolution order:
///
/// 1. **Alias** - built-in (`chatgpt`, `claude-3-sonnet`) or declared under `models`
/// 2. **Prefix notation** - `provider/model` (e.g. `openai/gpt-4o-mini`)
/// 3. **Model-name inference** - known prefixes like `claude-*` → Anthropic
pub struct ModelRegistry {
    aliases: BTreeMap<String, ModelSpec>,
    providers: ProvidersConfig,
    retry: RetryConfig,
}

impl ModelRegistry {
    /// Registry with only the built-in aliases and default endpoints.
    pub fn builtin() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            "chatgpt".to_string(),
            ModelSpec::new("openai", "gpt-4o", 0.0),
        );
        aliases.insert(
            "claude-3-sonnet".to_string(),
            ModelSpec::new("anthropic", "claude-3-sonnet-20240229", 0.3),
        );
        Self {
            aliases,
            providers: ProvidersConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Built-ins overlaid with the configured aliases, endpoints and retry policy.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::builtin();
        for (id, model) in &config.models {
            debug!("registering model alias {} -> {}/{}", id, model.provider, model.model);
            registry
                .aliases
                .insert(id.clone(), ModelSpec::from_config(model));
        }
        registry.providers = config.providers.clone();
        registry.retry = RetryConfig::from(&config.session.retry);
        registry
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Find the spec for `model_id` without touching credentials.
    pub fn lookup(&self, model_id: &str) -> Result<ModelSpec, ColloquyError> {
        if let Some(spec) = self.aliases.get(model_id) {
            return Ok(spec.clone());
        }

        let model_ref = parse_model_ref(model_id);
        if let Some(provider) = model_ref.provider {
            return Ok(ModelSpec::new(provider, model_ref.model, 0.0));
        }

        if let Some(inferred) = infer_provider_from_model(model_ref.model) {
            return Ok(ModelSpec::new(inferred, model_ref.model, 0.0));
        }

        Err(ColloquyError::UnknownModel {
            model: model_id.to_string(),
            role: None,
        })
    }

    /// Resolve a single identifier into an invocable capability.
    pub fn resolve(
        &self,
        model_id: &str,
        credentials: &dyn CredentialSource,
    ) -> Result<Capability, ColloquyError> {
        let spec = self.lookup(model_id)?;
        let variable = spec.credential_var().ok_or_else(|| ColloquyError::UnknownModel {
            model: model_id.to_string(),
            role: None,
        })?;
        let api_key = credentials
            .get(variable)
            .ok_or_else(|| ColloquyError::Credential {
                missing: vec![MissingCredential {
                    variable: variable.to_string(),
                    role: "requested".to_string(),
                    model: model_id.to_string(),
                }],
            })?;
        Ok(self.build(spec, api_key))
    }

    /// Resolve both agents' models, keyed by model identifier.
    ///
    /// Unknown identifiers fail first, before any provider client exists.
    /// Missing secrets are then collected across both roles and reported together.
    pub fn resolve_agents(
        &self,
        agents: &AgentsConfig,
        credentials: &dyn CredentialSource,
    ) -> Result<HashMap<String, Arc<Capability>>, ColloquyError> {
        let mut specs = Vec::new();
        for (role, agent) in agents.iter() {
            let spec = self.lookup(&agent.model).map_err(|_| ColloquyError::UnknownModel {
                model: agent.model.clone(),
                role: Some(role.to_string()),
            })?;
            specs.push((role, agent, spec));
        }

        let mut missing = Vec::new();
        let mut keys = HashMap::new();
        for (role, agent, spec) in &specs {
            let Some(variable) = spec.credential_var() else {
                return Err(ColloquyError::UnknownModel {
                    model: agent.model.clone(),
                    role: Some(role.to_string()),
                });
            };
            match credentials.get(variable) {
                Some(key) => {
                    keys.insert(agent.model.clone(), key);
                }
                None => missing.push(MissingCredential {
                    variable: variable.to_string(),
                    role: role.to_string(),
                    model: agent.model.clone(),
                }),
            }
        }
        if !missing.is_empty() {
            return Err(ColloquyError::Credential { missing });
        }

        let mut capabilities = HashMap::new();
        for (role, agent, spec) in specs {
            if capabilities.contains_key(&agent.model) {
                continue;
            }
            let Some(api_key) = keys.remove(&agent.model) else {
                continue;
            };
            info!(
                "{} agent '{}' uses {} model {}",
                role, agent.persona, spec.provider, spec.model
            );
            capabilities.insert(agent.model.clone(), Arc::new(self.build(spec, api_key)));
        }
        Ok(capabilities)
    }

    /// All registered aliases, ordered by identifier.
    pub fn list(&self) -> Vec<(&str, &ModelSpec)> {
        self.aliases
            .iter()
            .map(|(id, spec)| (id.as_str(), spec))
            .collect()
    }

    fn build(&self, spec: ModelSpec, api_key: String) -> Capability {
        let api_base = self
            .providers
            .get(&spec.provider)
            .and_then(|p| p.api_base.clone())
            .filter(|base| !base.trim().is_empty());
        let model = Some(spec.model.clone());

        let provider: Arc<dyn LLMProvider> = match (spec.provider.as_str(), api_base) {
            ("anthropic", Some(base)) => {
                Arc::new(AnthropicProvider::with_base_url(api_key, model, base))
            }
            ("anthropic", None) => Arc::new(AnthropicProvider::new(api_key, model)),
            (_, Some(base)) => Arc::new(OpenAIProvider::with_base_url(api_key, model, base)),
            (_, None) => Arc::new(OpenAIProvider::new(api_key, model)),
        };
        Capability::new(provider, spec, self.retry.clone())
    }
}
