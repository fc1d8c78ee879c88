//! Project Configuration (coolrunner.toml)
//!
//! Handles project-level configuration stored in `coolrunner.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from coolrunner.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Run configuration
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Watch mode configuration
    #[serde(default)]
    pub watch: WatchConfig,
}

/// `[runner]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Directory scanned for test modules (default: "tests")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_dir: Option<PathBuf>,

    /// Timeout for each hook and test in milliseconds (default: 2000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// File extensions treated as suite scripts (default: ["toml"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
}

/// `[watch]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Source directory watched alongside the test directory (default: "src")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_dir: Option<PathBuf>,

    /// Minimum milliseconds between the starts of two runs (default: 2000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,

    /// Clear the terminal before each run (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_screen: Option<bool>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.runner.timeout_ms == Some(0) {
            return Err(invalid("runner.timeout_ms", "timeout must be greater than zero"));
        }

        if let Some(extensions) = &self.runner.extensions {
            if extensions.is_empty() {
                return Err(invalid("runner.extensions", "at least one extension is required"));
            }
            if let Some(blank) = extensions.iter().find(|ext| ext.trim_start_matches('.').is_empty()) {
                return Err(invalid(
                    "runner.extensions",
                    &format!("'{}' is not a file extension", blank),
                ));
            }
        }

        if self.watch.debounce_ms == Some(0) {
            return Err(invalid("watch.debounce_ms", "debounce must be greater than zero"));
        }

        // Directories are resolved against the project root by the loader
        // and may not exist yet.
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
