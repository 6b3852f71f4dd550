// Shared test helpers. Not all items are used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use colloquy::agent::{Orchestrator, ScriptedChannel, TurnExecutor};
use colloquy::config::{AgentConfig, AgentsConfig};
use colloquy::errors::ColloquyError;
use colloquy::memory::{ConversationMemory, ConversationStore};
use colloquy::providers::base::{ChatRequest, LLMProvider, LLMResponse, Message, RetryConfig};
use colloquy::providers::{Capability, ModelSpec};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BUILDER_MODEL: &str = "builder-model";
pub const JUDGE_MODEL: &str = "judge-model";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl RecordedCall {
    /// Content of the final (input) prompt entry.
    pub fn input(&self) -> &str {
        self.messages.last().map_or("", |m| m.content.as_str())
    }
}

/// Scripted provider: pops queued results, records every request.
pub struct MockLLMProvider {
    responses: Mutex<VecDeque<anyhow::Result<LLMResponse>>>,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub default_response: String,
}

impl MockLLMProvider {
    pub fn with_responses(responses: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(text_response(r))).collect()),
            calls: Mutex::new(Vec::new()),
            default_response: "Mock response".to_string(),
        })
    }

    /// Every call fails with a non-retryable provider error.
    pub fn failing(message: &str) -> Arc<Self> {
        let provider = Self::with_responses(vec![]);
        let mut queue = provider.responses.lock().unwrap();
        for _ in 0..16 {
            queue.push_back(Err(ColloquyError::Provider {
                message: message.to_string(),
                retryable: false,
            }
            .into()));
        }
        drop(queue);
        provider
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn chat(&self, req: ChatRequest<'_>) -> anyhow::Result<LLMResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: req.messages,
            model: req.model.map(|s| s.to_string()),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        });

        let response = self.responses.lock().unwrap().pop_front();
        response.unwrap_or_else(|| Ok(text_response(&self.default_response)))
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}

pub fn text_response(content: &str) -> LLMResponse {
    LLMResponse::text(content)
}

pub fn agents() -> AgentsConfig {
    AgentsConfig {
        builder: AgentConfig::new(BUILDER_MODEL, "Bob", "You are a pragmatic web developer."),
        judge: AgentConfig::new(JUDGE_MODEL, "Judy", "You critique plans bluntly."),
    }
}

pub fn capability(provider: Arc<MockLLMProvider>) -> Arc<Capability> {
    Arc::new(Capability::new(
        provider,
        ModelSpec::new("openai", "gpt-4o", 0.0),
        RetryConfig::none(),
    ))
}

/// Orchestrator wired to mock providers, a scripted channel and a sink transcript.
pub async fn orchestrator(
    builder: Arc<MockLLMProvider>,
    judge: Arc<MockLLMProvider>,
    store: Arc<dyn ConversationStore>,
    lines: Vec<&str>,
) -> Orchestrator {
    let mut capabilities = HashMap::new();
    capabilities.insert(BUILDER_MODEL.to_string(), capability(builder));
    capabilities.insert(JUDGE_MODEL.to_string(), capability(judge));
    let memory = ConversationMemory::open(store).await.unwrap();
    Orchestrator::new(
        agents(),
        TurnExecutor::new(capabilities),
        memory,
        Box::new(ScriptedChannel::new(lines)),
    )
    .with_turn_delay(Duration::ZERO)
    .with_output(Box::new(std::io::sink()))
}

/// Write a configuration document into `dir` and return its path.
pub fn write_config(dir: &Path, json: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(".mcp.config.json");
    std::fs::write(&path, serde_json::to_string_pretty(json).unwrap()).unwrap();
    path
}
