//! Configuration loading and validation for the remold engine.
//!
//! Settings come from an optional TOML file with environment variable
//! overrides. Every setting has a default, so an absent file is not an
//! error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`EngineConfig::max_resolution_depth`].
pub const ENV_MAX_RESOLUTION_DEPTH: &str = "REMOLD_MAX_RESOLUTION_DEPTH";

/// Environment variable overriding [`EngineConfig::trace_skips`].
pub const ENV_TRACE_SKIPS: &str = "REMOLD_TRACE_SKIPS";

/// Resolution engine settings.
///
/// ```toml
/// max_resolution_depth = 1000
/// trace_skips = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many times a deferred leaf may resolve into something that needs
    /// resolving again before the engine gives up.
    #[serde(default = "default_max_resolution_depth")]
    pub max_resolution_depth: usize,

    /// Emit a trace event for every template entry dropped by a skip.
    #[serde(default = "default_true")]
    pub trace_skips: bool,
}

fn default_max_resolution_depth() -> usize {
    1000
}
fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: default_max_resolution_depth(),
            trace_skips: default_true(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            origin: "inline TOML".into(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            origin: path.display().to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "Loaded engine config");
        Ok(config)
    }

    /// Apply `REMOLD_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_MAX_RESOLUTION_DEPTH) {
            self.max_resolution_depth = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{ENV_MAX_RESOLUTION_DEPTH} must be a positive integer, got {raw:?}"
                ))
            })?;
        }

        if let Some(raw) = lookup(ENV_TRACE_SKIPS) {
            self.trace_skips = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "{ENV_TRACE_SKIPS} must be a boolean, got {raw:?}"
                    )));
                }
            };
        }

        self.validate()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError(
                "max_resolution_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config from {origin}: {reason}")]
    ParseError { origin: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
