use crate::providers::base::{ChatRequest, LLMProvider, LLMResponse, Message, ProviderMetrics};
use crate::providers::errors::ProviderErrorHandler;
use crate::providers::provider_http_client;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::debug;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize, PartialEq)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Value,
}

/// Convert generic messages to Anthropic API format.
/// Returns (`system_prompt`, `anthropic_messages`).
///
/// System entries are lifted into the top-level `system` field. Consecutive
/// same-role entries are merged into one message with several text blocks,
/// since the API expects strictly alternating turns.
pub fn convert_messages(messages: Vec<Message>) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system_parts = Vec::new();
    let mut merged: Vec<AnthropicMessage> = Vec::new();

    for msg in messages {
        let role = match msg.role.as_str() {
            "system" => {
                if !msg.content.is_empty() {
                    system_parts.push(msg.content);
                }
                continue;
            }
            "user" => "user",
            "assistant" => "assistant",
            other => {
                debug!("skipping message with unsupported role: {}", other);
                continue;
            }
        };

        if let Some(last) = merged.last_mut()
            && last.role == role
        {
            let mut combined = match &last.content {
                Value::Array(arr) => arr.clone(),
                Value::String(s) => vec![json!({"type": "text", "text": s})],
                other => vec![other.clone()],
            };
            combined.push(json!({"type": "text", "text": msg.content}));
            last.content = Value::Array(combined);
            continue;
        }

        merged.push(AnthropicMessage {
            role: role.to_string(),
            content: Value::String(msg.content),
        });
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    (system, merged)
}

/// Parse an Anthropic API response into a generic [`LLMResponse`].
///
/// All text blocks are concatenated; other block types are ignored.
pub fn parse_response(json: &Value) -> LLMResponse {
    let content = json["content"].as_array().and_then(|arr| {
        let texts: Vec<&str> = arr
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    });

    let usage = json.get("usage");
    LLMResponse {
        content,
        input_tokens: usage
            .and_then(|u| u.get("input_tokens"))
            .and_then(Value::as_u64),
        output_tokens: usage
            .and_then(|u| u.get("output_tokens"))
            .and_then(Value::as_u64),
    }
}

pub struct AnthropicProvider {
    api_key: String,
    default_model: String,
    base_url: String,
    client: Client,
    metrics: Arc<Mutex<ProviderMetrics>>,
}

impl AnthropicProvider {
    pub fn new(api_key: String, default_model: Option<String>) -> Self {
        Self::with_base_url(api_key, default_model, API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, default_model: Option<String>, base_url: String) -> Self {
        Self {
            api_key,
            default_model: default_model.unwrap_or_else(|| "claude-3-sonnet-20240229".to_string()),
            base_url,
            client: provider_http_client(),
            metrics: Arc::new(Mutex::new(ProviderMetrics::default())),
        }
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> Result<LLMResponse> {
        let model = req.model.unwrap_or(&self.default_model);
        debug!("anthropic chat: model={}", model);
        let (system, anthropic_messages) = convert_messages(req.messages);

        let mut payload = json!({
            "model": model,
            "messages": anthropic_messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });
        if let Some(system) = system {
            payload["system"] = json!(system);
        }

        let resp = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderErrorHandler::transport_error(e, "Anthropic", &self.metrics))?;

        let json = ProviderErrorHandler::check_response(resp, "Anthropic", &self.metrics).await?;
        let response = parse_response(&json);

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.request_count += 1;
            metrics.token_count +=
                response.input_tokens.unwrap_or(0) + response.output_tokens.unwrap_or(0);
        }

        debug!(
            "anthropic chat complete: input_tokens={:?}, output_tokens={:?}",
            response.input_tokens, response.output_tokens
        );
        Ok(response)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn metrics(&self) -> ProviderMetrics {
        self.metrics
            .lock()
            .map_or_else(|_| ProviderMetrics::default(), |m| m.clone())
    }
}
