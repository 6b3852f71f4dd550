use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two fixed conversational roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Builder,
    Judge,
}

impl AgentRole {
    pub const ALL: [AgentRole; 2] = [AgentRole::Builder, AgentRole::Judge];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Builder => "builder",
            Self::Judge => "judge",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static descriptor for an agent: which model answers, under which display
/// name, and with which system instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub model: String,
    pub persona: String,
    #[serde(rename = "rolePrompt")]
    pub role_prompt: String,
}

impl AgentConfig {
    pub fn new(
        model: impl Into<String>,
        persona: impl Into<String>,
        role_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            persona: persona.into(),
            role_prompt: role_prompt.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    pub builder: AgentConfig,
    pub judge: AgentConfig,
}

impl AgentsConfig {
    pub fn get(&self, role: AgentRole) -> &AgentConfig {
        match role {
            AgentRole::Builder => &self.builder,
            AgentRole::Judge => &self.judge,
        }
    }

    /// Both descriptors in turn order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentRole, &AgentConfig)> {
        AgentRole::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}
