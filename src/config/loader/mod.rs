use crate::config::Config;
use crate::errors::ColloquyError;
use crate::utils::resolve_relative;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".mcp.config.json";

pub fn get_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Load and validate the configuration document at `path`.
///
/// A relative `session.memoryPath` is rewritten against the directory that
/// holds the configuration file, so the store location does not depend on
/// the process working directory.
pub fn load_config(path: &Path) -> Result<Config, ColloquyError> {
    if !path.exists() {
        return Err(ColloquyError::Config(format!(
            "configuration file not found at {}",
            path.display()
        )));
    }

    let mut config = read_config(path).map_err(|e| ColloquyError::Config(format!("{e:#}")))?;

    let base = config_dir(path);
    config.session.memory_path = resolve_relative(&base, &config.session.memory_path);
    debug!(
        "loaded config from {} (memory at {})",
        path.display(),
        config.session.memory_path.display()
    );

    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    // Shared (read) lock: concurrent readers are fine, a writer mid-save is not
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open config at {}", path.display()))?;
    FileExt::lock_shared(&file)
        .with_context(|| "Failed to acquire shared lock on config file")?;

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    // Lock released when `file` drops at end of scope

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config JSON from {}", path.display()))
}

/// Directory containing the configuration file; `.` for bare file names.
pub fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
