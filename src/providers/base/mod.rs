use crate::config::RetrySettings;
use crate::errors::ColloquyError;
use async_trait::async_trait;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: Option<String>,
    /// Input token count reported by the provider (if available).
    pub input_tokens: Option<u64>,
    /// Output token count reported by the provider (if available).
    pub output_tokens: Option<u64>,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            input_tokens: None,
            output_tokens: None,
        }
    }
}

/// A role-tagged prompt entry in provider vocabulary (`system`, `user`, `assistant`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Metrics for provider operations
#[derive(Debug, Clone, Default)]
pub struct ProviderMetrics {
    pub request_count: u64,
    pub token_count: u64,
    pub error_count: u64,
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_delay_ms: settings.initial_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            ..Self::default()
        }
    }
}

impl RetryConfig {
    /// No retries: a single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Parameters for a chat request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub messages: Vec<Message>,
    pub model: Option<&'a str>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One implementation per provider family (Anthropic, OpenAI).
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, req: ChatRequest<'_>) -> anyhow::Result<LLMResponse>;

    fn default_model(&self) -> &str;

    /// Return accumulated provider metrics (requests, tokens, errors).
    /// Default returns zeroed metrics for providers that don't track them.
    fn metrics(&self) -> ProviderMetrics {
        ProviderMetrics::default()
    }

    /// Chat with automatic retry on transient errors.
    async fn chat_with_retry(
        &self,
        req: ChatRequest<'_>,
        retry_config: Option<RetryConfig>,
    ) -> anyhow::Result<LLMResponse> {
        let config = retry_config.unwrap_or_default();
        let mut last_error = None;

        let messages = req.messages;

        for attempt in 0..=config.max_retries {
            if attempt > 0 {
                warn!(
                    "Provider retry attempt {}/{} after error: {}",
                    attempt,
                    config.max_retries,
                    last_error
                        .as_ref()
                        .map(|e: &anyhow::Error| e.to_string())
                        .unwrap_or_default()
                );
            }
            debug!("Sending chat request (attempt {})", attempt);
            let chat_req = ChatRequest {
                messages: messages.clone(),
                model: req.model,
                max_tokens: req.max_tokens,
                temperature: req.temperature,
            };
            match self.chat(chat_req).await {
                Ok(response) => {
                    debug!("Chat request succeeded on attempt {}", attempt);
                    return Ok(response);
                }
                Err(e) => {
                    let typed = e.downcast_ref::<ColloquyError>();
                    // Check for rate limit with retry_after hint
                    let rate_limit_delay = typed.and_then(|err| match err {
                        ColloquyError::RateLimit { retry_after } => *retry_after,
                        _ => None,
                    });
                    // Untyped errors (transport failures) are treated as transient
                    let is_transient = typed.is_none_or(ColloquyError::is_retryable);
                    warn!("Chat request failed on attempt {}: {}", attempt, e);
                    if !is_transient {
                        return Err(e);
                    }
                    last_error = Some(e);
                    if attempt < config.max_retries {
                        let delay = if let Some(retry_secs) = rate_limit_delay {
                            debug!("Using retry-after hint: {}s", retry_secs);
                            retry_secs.saturating_mul(1000).min(config.max_delay_ms)
                        } else {
                            let base = (config.initial_delay_ms as f64
                                * config.backoff_multiplier.powi(attempt as i32))
                            .min(config.max_delay_ms as f64)
                                as u64;
                            // Add jitter (up to 25% of delay) to avoid thundering herd
                            let jitter = (base as f64 * 0.25 * fastrand::f64()) as u64;
                            debug!(
                                "Waiting {}ms before retry ({}ms base + {}ms jitter)",
                                base + jitter,
                                base,
                                jitter
                            );
                            base + jitter
                        };
                        tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("All retry attempts failed")))
    }
}

#[cfg(test)]
mod tests;
