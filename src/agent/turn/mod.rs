use crate::config::AgentConfig;
use crate::errors::ColloquyError;
use crate::memory::{ConversationMemory, Message, Role};
use crate::providers::Capability;
use crate::providers::base::Message as PromptMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Marker that prefixes placeholder replies recorded when a model call fails.
pub const PROVIDER_ERROR_MARKER: &str = "[provider-error]";

/// Text recorded in place of a reply when `persona`'s model call failed.
pub fn provider_error_reply(persona: &str, error: &ColloquyError) -> String {
    format!("{PROVIDER_ERROR_MARKER} {persona} could not respond: {error}")
}

/// Assemble the prompt for one turn: the role prompt, the full history, then
/// `input` as the final user entry.
pub fn build_prompt(agent: &AgentConfig, history: &[Message], input: &str) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(PromptMessage::system(agent.role_prompt.clone()));
    messages.extend(history.iter().map(|m| match m.role {
        Role::Human => PromptMessage::user(m.content.clone()),
        Role::Assistant => PromptMessage::assistant(m.content.clone()),
    }));
    messages.push(PromptMessage::user(input));
    messages
}

/// Runs single agent turns against resolved capabilities.
pub struct TurnExecutor {
    capabilities: HashMap<String, Arc<Capability>>,
}

impl TurnExecutor {
    /// `capabilities` is keyed by model identifier, as returned by
    /// [`ModelRegistry::resolve_agents`](crate::providers::ModelRegistry::resolve_agents).
    pub fn new(capabilities: HashMap<String, Arc<Capability>>) -> Self {
        Self { capabilities }
    }

    /// Run `agent` on `input` with the current log as context.
    ///
    /// The reply (or a provider-error placeholder) is appended to `memory` as an
    /// Assistant message and returned. `input` itself is not recorded. Only
    /// persistence failures are returned as errors.
    pub async fn execute(
        &self,
        agent: &AgentConfig,
        input: &str,
        memory: &mut ConversationMemory,
    ) -> Result<String, ColloquyError> {
        let capability =
            self.capabilities
                .get(&agent.model)
                .ok_or_else(|| ColloquyError::UnknownModel {
                    model: agent.model.clone(),
                    role: None,
                })?;

        let prompt = build_prompt(agent, memory.messages(), input);
        debug!(
            "{} turn: {} prompt entries via {}",
            agent.persona,
            prompt.len(),
            capability.spec().model
        );

        let reply = match capability.invoke(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} turn failed: {}", agent.persona, e);
                provider_error_reply(&agent.persona, &e)
            }
        };

        memory.append(Message::assistant(reply.clone())).await?;
        Ok(reply)
    }
}
