// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration loaded from `rollback.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "rollback.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("no state directory: set state_dir, RB_STATE_DIR, or HOME")]
    NoStateDir,
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
    #[error("invalid environment name '{0}': use letters, digits, '-' or '_'")]
    InvalidEnvironmentName(String),
}

/// Per-environment retention caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub points: usize,
    pub executions: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { points: 50, executions: 100 }
    }
}

impl RetentionConfig {
    crate::setters! {
        set {
            points: usize,
            executions: usize,
        }
    }
}

/// Settings for one deployment target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Enumerated configuration files captured verbatim.
    pub config_files: Vec<PathBuf>,
    /// Working tree used by the version-control client.
    pub repo: Option<PathBuf>,
    /// Command producing a data-store dump at `$RB_DUMP_PATH`.
    pub data_dump: Option<String>,
    /// Command restoring the data store from `$RB_DUMP_PATH`.
    pub data_restore: Option<String>,
    /// Named external operations run by the process shell.
    pub operations: BTreeMap<String, String>,
}

impl EnvironmentConfig {
    pub fn operation(&self, name: &str) -> Option<&str> {
        self.operations.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub state_dir: Option<PathBuf>,
    pub step_timeout_ms: u64,
    pub capture_timeout_ms: u64,
    pub retention: RetentionConfig,
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: None,
            step_timeout_ms: 300_000,
            capture_timeout_ms: 600_000,
            retention: RetentionConfig::default(),
            environments: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        for name in config.environments.keys() {
            validate_environment_name(name)?;
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(path, &content)
    }

    /// Resolve the config path: explicit flag > RB_CONFIG > ./rollback.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var("RB_CONFIG") {
            return PathBuf::from(path);
        }
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Resolve state directory: state_dir > RB_STATE_DIR > XDG_STATE_HOME/rb > ~/.local/state/rb
    pub fn state_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        if let Ok(dir) = std::env::var("RB_STATE_DIR") {
            return Ok(PathBuf::from(dir));
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return Ok(PathBuf::from(xdg).join("rb"));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
        Ok(home.join(".local/state/rb"))
    }

    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig, ConfigError> {
        self.environments.get(name).ok_or_else(|| ConfigError::UnknownEnvironment(name.to_string()))
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

/// Environment names become file names in the state directory.
pub fn validate_environment_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvironmentName(name.to_string()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
