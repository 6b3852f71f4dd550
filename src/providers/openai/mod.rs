use crate::providers::base::{ChatRequest, LLMProvider, LLMResponse, ProviderMetrics};
use crate::providers::errors::ProviderErrorHandler;
use crate::providers::provider_http_client;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing::debug;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

fn is_reasoning_model(model: &str) -> bool {
    let m = model.to_lowercase();
    ["o1", "o3", "o4"].iter().any(|prefix| m.starts_with(prefix))
}

pub struct OpenAIProvider {
    api_key: String,
    default_model: String,
    base_url: String,
    client: Client,
    metrics: Arc<Mutex<ProviderMetrics>>,
}

impl OpenAIProvider {
    pub fn new(api_key: String, default_model: Option<String>) -> Self {
        Self::with_base_url(api_key, default_model, API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, default_model: Option<String>, base_url: String) -> Self {
        Self {
            api_key,
            default_model: default_model.unwrap_or_else(|| "gpt-4o".to_string()),
            base_url,
            client: provider_http_client(),
            metrics: Arc::new(Mutex::new(ProviderMetrics::default())),
        }
    }

    fn parse_response(json: &Value) -> Result<LLMResponse> {
        let choice = json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .context("No choices in OpenAI response")?;

        let content = choice["message"]["content"]
            .as_str()
            .map(std::string::ToString::to_string);

        let usage = json.get("usage");
        Ok(LLMResponse {
            content,
            input_tokens: usage
                .and_then(|u| u.get("prompt_tokens"))
                .and_then(Value::as_u64),
            output_tokens: usage
                .and_then(|u| u.get("completion_tokens"))
                .and_then(Value::as_u64),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> Result<LLMResponse> {
        let model = req.model.unwrap_or(&self.default_model);
        debug!("openai chat: model={}", model);

        let openai_messages: Vec<Value> = req
            .messages
            .into_iter()
            .map(|msg| json!({"role": msg.role, "content": msg.content}))
            .collect();

        let payload = if is_reasoning_model(model) {
            // o-series models reject `max_tokens` and any non-default temperature
            json!({
                "model": model,
                "messages": openai_messages,
                "max_completion_tokens": req.max_tokens,
            })
        } else {
            json!({
                "model": model,
                "messages": openai_messages,
                "max_tokens": req.max_tokens,
                "temperature": req.temperature,
            })
        };

        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderErrorHandler::transport_error(e, "OpenAI", &self.metrics))?;

        let json = ProviderErrorHandler::check_response(resp, "OpenAI", &self.metrics).await?;
        let response = Self::parse_response(&json)?;

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.request_count += 1;
            if let Some(total) = json["usage"]["total_tokens"].as_u64() {
                metrics.token_count += total;
            }
        }

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
