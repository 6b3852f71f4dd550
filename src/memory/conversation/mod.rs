use crate::errors::ColloquyError;
use crate::memory::store::ConversationStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Who authored a logged turn. Serialized in provider vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    Human,
    #[serde(rename = "assistant")]
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Human => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted turn of the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only conversation log mirrored to a [`ConversationStore`].
///
/// Every append rewrites the store before returning. If the write fails the
/// in-process log is rolled back, so memory and disk never diverge.
pub struct ConversationMemory {
    store: Arc<dyn ConversationStore>,
    log: Vec<Message>,
}

impl ConversationMemory {
    /// Load the existing log from `store` (creating an empty one if absent).
    pub async fn open(store: Arc<dyn ConversationStore>) -> Result<Self, ColloquyError> {
        let log = store.load().await?;
        debug!("conversation memory opened with {} messages", log.len());
        Ok(Self { store, log })
    }

    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    pub fn last(&self) -> Option<&Message> {
        self.log.last()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub async fn append(&mut self, message: Message) -> Result<(), ColloquyError> {
        self.log.push(message);
        if let Err(e) = self.store.persist(&self.log).await {
            self.log.pop();
            warn!("rolled back unpersisted message: {}", e);
            return Err(match e {
                ColloquyError::Persistence(_) => e,
                other => ColloquyError::Persistence(other.to_string()),
            });
        }
        Ok(())
    }

    /// Append `prompt` as a Human message if the log is empty.
    /// Returns whether a seed was written.
    pub async fn seed_if_empty(&mut self, prompt: &str) -> Result<bool, ColloquyError> {
        if !self.log.is_empty() {
            return Ok(false);
        }
        debug!("seeding empty conversation");
        self.append(Message::human(prompt)).await?;
        Ok(true)
    }
}
