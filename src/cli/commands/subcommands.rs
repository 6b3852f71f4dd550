use crate::agent::{Orchestrator, StdinChannel, TurnExecutor};
use crate::config::{AgentRole, Config, EnvCredentials, load_config};
use crate::errors::ColloquyError;
use crate::memory::{ConversationMemory, JsonFileStore, Message, Role};
use crate::providers::{Capability, ModelRegistry};
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything the dialogue needs, resolved before the first model call.
struct Session {
    config: Config,
    capabilities: HashMap<String, Arc<Capability>>,
    memory: ConversationMemory,
}

/// Load config, resolve both agents' models and open the memory store.
/// Any failure here is startup-fatal.
async fn prepare(config_path: &Path) -> Result<Session, ColloquyError> {
    let config = load_config(config_path)?;
    let registry = ModelRegistry::from_config(&config);
    let capabilities = registry.resolve_agents(&config.agents, &EnvCredentials)?;
    let store = JsonFileStore::open(&config.session.memory_path)?;
    let memory = ConversationMemory::open(Arc::new(store)).await?;
    Ok(Session {
        config,
        capabilities,
        memory,
    })
}

pub(super) async fn run_command(config_path: &Path) -> Result<()> {
    let Session {
        config,
        capabilities,
        memory,
    } = prepare(config_path).await?;

    let tracked: Vec<(String, Arc<Capability>)> = capabilities
        .iter()
        .map(|(id, cap)| (id.clone(), Arc::clone(cap)))
        .collect();

    let channel = StdinChannel::new(config.session.idle_timeout_secs.map(Duration::from_secs));
    let mut orchestrator = Orchestrator::new(
        config.agents.clone(),
        TurnExecutor::new(capabilities),
        memory,
        Box::new(channel),
    )
    .with_session(&config.session);

    let interrupted = tokio::select! {
        result = orchestrator.run() => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        println!();
        info!(
            "interrupted after {} rounds, {} messages saved",
            orchestrator.rounds(),
            orchestrator.memory().len()
        );
    }
    for (id, capability) in &tracked {
        let metrics = capability.metrics();
        info!(
            "{}: {} requests, {} tokens, {} errors",
            id, metrics.request_count, metrics.token_count, metrics.error_count
        );
    }
    Ok(())
}

pub(super) async fn check_command(config_path: &Path) -> Result<()> {
    let session = prepare(config_path).await?;
    let registry = ModelRegistry::from_config(&session.config);
    for line in check_summary(&session, &registry) {
        println!("{line}");
    }
    Ok(())
}

fn check_summary(session: &Session, registry: &ModelRegistry) -> Vec<String> {
    let mut lines = vec!["\u{2713} configuration valid".to_string()];
    for (role, agent) in session.config.agents.iter() {
        let target = registry.lookup(&agent.model).map_or_else(
            |_| "unresolved".to_string(),
            |spec| format!("{}/{}", spec.provider, spec.model),
        );
        lines.push(format!(
            "\u{2713} {} '{}' -> {} ({})",
            role, agent.persona, agent.model, target
        ));
    }
    lines.push(format!(
        "\u{2713} {} model(s) resolved, credentials present",
        session.capabilities.len()
    ));
    lines.push(format!(
        "\u{2713} memory store {} ({} messages)",
        session.config.session.memory_path.display(),
        session.memory.len()
    ));
    lines
}

pub(super) async fn history_command(config_path: &Path, last: Option<usize>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = JsonFileStore::open(&config.session.memory_path)?;
    let memory = ConversationMemory::open(Arc::new(store)).await?;

    if memory.is_empty() {
        println!("No conversation yet.");
        return Ok(());
    }
    for line in format_history(memory.messages(), &config, last) {
        println!("{line}");
    }
    Ok(())
}

/// Render log entries as `[index] speaker: content`. Assistant entries are
/// labelled by alternating Builder/Judge persona following the round structure.
pub(super) fn format_history(messages: &[Message], config: &Config, last: Option<usize>) -> Vec<String> {
    let mut next = AgentRole::Builder;
    let mut labelled = Vec::with_capacity(messages.len());
    for message in messages {
        let speaker = match message.role {
            Role::Human => {
                next = AgentRole::Builder;
                "human".to_string()
            }
            Role::Assistant => {
                let role = next;
                next = match role {
                    AgentRole::Builder => AgentRole::Judge,
                    AgentRole::Judge => AgentRole::Builder,
                };
                config.agents.get(role).persona.clone()
            }
        };
        labelled.push((speaker, &message.content));
    }

    let skip = last.map_or(0, |n| labelled.len().saturating_sub(n));
    labelled
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(|(i, (speaker, content))| format!("[{}] {}: {}", i + 1, speaker, content))
        .collect()
}

pub(super) fn models_command(config_path: &Path) -> Result<()> {
    let registry = if config_path.exists() {
        ModelRegistry::from_config(&load_config(config_path)?)
    } else {
        ModelRegistry::builtin()
    };
    println!("Registered models:");
    for line in format_models(&registry) {
        println!("{line}");
    }
    println!("\nOther names resolve via provider/model prefixes or claude-*/gpt-* inference.");
    Ok(())
}

pub(super) fn format_models(registry: &ModelRegistry) -> Vec<String> {
    registry
        .list()
        .into_iter()
        .map(|(id, spec)| {
            format!(
                "  {:<20} {}/{} (temperature {}, max tokens {})",
                id, spec.provider, spec.model, spec.temperature, spec.max_tokens
            )
        })
        .collect()
}
