//! Config file discovery and loading.

use crate::env::resolve_env_vars;
use crate::schema::SignShuffleConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the signshuffle config directory.
/// Priority: `SIGNSHUFFLE_CONFIG_DIR` env > `~/.signshuffle/` > `./.signshuffle`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SIGNSHUFFLE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".signshuffle"))
        .unwrap_or_else(|| PathBuf::from(".signshuffle"))
}

/// Resolve the config file: `SIGNSHUFFLE_CONFIG` if set, else `<config_dir>/config.yaml`.
pub fn config_file_path() -> PathBuf {
    std::env::var("SIGNSHUFFLE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join(CONFIG_FILE_NAME))
}

/// Parse YAML text into a typed config after `${VAR}` substitution.
pub fn parse_config(raw: &str) -> Result<SignShuffleConfig> {
    if raw.trim().is_empty() {
        return Ok(SignShuffleConfig::default());
    }
    let value: Value = serde_yaml::from_str(raw).context("Failed to parse config YAML")?;
    let value = match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    serde_json::from_value(value).context("Config does not match the expected schema")
}

/// Load the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<SignShuffleConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(SignShuffleConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config =
        parse_config(&raw).with_context(|| format!("Invalid config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}
