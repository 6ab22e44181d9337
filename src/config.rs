use crate::{MockError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".static-mock.toml";

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "STATIC_MOCK_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingConfig {
    /// Route calls made on threads other than the owner through the mock.
    /// When false such calls run the real implementation.
    #[serde(default = "default_foreign_threads")]
    pub foreign_threads: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsConfig {
    /// Maximum number of recorded calls listed in a verification failure
    #[serde(default = "default_max_listed_calls")]
    pub max_listed_calls: usize,
}

fn default_foreign_threads() -> bool {
    true
}

fn default_max_listed_calls() -> usize {
    20
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            foreign_threads: default_foreign_threads(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_listed_calls: default_max_listed_calls(),
        }
    }
}

impl Config {
    /// Load configuration from `$STATIC_MOCK_CONFIG` or the working directory
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            MockError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&content)
            .map_err(|e| MockError::Config(format!("Invalid config in {:?}: {}", path, e)))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MockError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load config, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load static mock config: {}. Using defaults.", e);
                Config::default()
            }
        }
    }
}
