use crate::errors::ColloquyError;
use crate::memory::conversation::Message;
use crate::utils::{atomic_write, ensure_dir};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Durable backing for the conversation log.
///
/// `persist` receives the complete log and replaces whatever was stored.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the stored log, creating an empty one if none exists.
    async fn load(&self) -> Result<Vec<Message>, ColloquyError>;

    /// Replace the stored log with `messages`.
    async fn persist(&self, messages: &[Message]) -> Result<(), ColloquyError>;
}

/// Pretty-printed JSON array on disk, rewritten atomically on every persist.
///
/// Holds an exclusive lock on `<path>.lock` for its whole lifetime, so only
/// one session can write a given history file at a time.
pub struct JsonFileStore {
    path: PathBuf,
    _lock: fs::File,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ColloquyError> {
        let path = path.into();
        let lock = acquire_lock(&path).map_err(|e| ColloquyError::Store(format!("{e:#}")))?;
        debug!("opened conversation store at {}", path.display());
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Message>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse conversation log {}", self.path.display()))
    }

    fn write(&self, messages: &[Message]) -> Result<()> {
        let json = serde_json::to_string_pretty(messages)?;
        atomic_write(&self.path, &json)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn acquire_lock(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    let lock_file = lock_path(path);
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_file)
        .with_context(|| format!("Failed to open lock file {}", lock_file.display()))?;
    file.try_lock_exclusive()
        .with_context(|| format!("{} is in use by another session", path.display()))?;
    Ok(file)
}

#[async_trait]
impl ConversationStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Message>, ColloquyError> {
        if !self.path.exists() {
            info!("creating empty conversation log at {}", self.path.display());
            self.write(&[]).map_err(|e| ColloquyError::Store(format!("{e:#}")))?;
            return Ok(Vec::new());
        }
        self.read().map_err(|e| ColloquyError::Store(format!("{e:#}")))
    }

    async fn persist(&self, messages: &[Message]) -> Result<(), ColloquyError> {
        self.write(messages)
            .map_err(|e| ColloquyError::Persistence(format!("{e:#}")))
    }
}

/// Process-local store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }

    /// Copy of what was last persisted.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load(&self) -> Result<Vec<Message>, ColloquyError> {
        Ok(self.snapshot())
    }

    async fn persist(&self, messages: &[Message]) -> Result<(), ColloquyError> {
        let mut stored = self
            .messages
            .lock()
            .map_err(|e| ColloquyError::Persistence(e.to_string()))?;
        *stored = messages.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests;
