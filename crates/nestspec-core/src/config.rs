//! Run configuration
//!
//! Layered the usual way: defaults, then an optional TOML or JSON file, then
//! `NESTSPEC_*` environment variables, then validation.

use crate::descriptor::DEFAULT_PATH_SEPARATOR;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding [`RunConfig::filter`]
pub const ENV_FILTER: &str = "NESTSPEC_FILTER";
/// Environment variable overriding [`RunConfig::fail_fast`]
pub const ENV_FAIL_FAST: &str = "NESTSPEC_FAIL_FAST";
/// Environment variable overriding [`RunConfig::path_separator`]
pub const ENV_PATH_SEPARATOR: &str = "NESTSPEC_PATH_SEPARATOR";
/// Environment variable overriding [`RunConfig::honor_focus`]
pub const ENV_HONOR_FOCUS: &str = "NESTSPEC_HONOR_FOCUS";

/// Options controlling which tests run and how they are named
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Only run tests whose joined path contains this substring
    pub filter: Option<String>,
    /// Skip every remaining test after the first failure
    pub fail_fast: bool,
    /// Separator used when joining paths for filtering and logging
    pub path_separator: String,
    /// When any node is focused, skip everything not under a focused node
    pub honor_focus: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            filter: None,
            fail_fast: false,
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            honor_focus: true,
        }
    }
}

impl RunConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Apply `NESTSPEC_*` environment overrides
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(filter) = std::env::var(ENV_FILTER) {
            self.filter = if filter.is_empty() { None } else { Some(filter) };
        }
        if let Ok(value) = std::env::var(ENV_FAIL_FAST) {
            self.fail_fast = parse_flag(ENV_FAIL_FAST, &value)?;
        }
        if let Ok(separator) = std::env::var(ENV_PATH_SEPARATOR) {
            self.path_separator = separator;
        }
        if let Ok(value) = std::env::var(ENV_HONOR_FOCUS) {
            self.honor_focus = parse_flag(ENV_HONOR_FOCUS, &value)?;
        }
        Ok(())
    }

    /// Defaults overridden by the environment, validated
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runner cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path_separator.is_empty() {
            return Err(ConfigError::invalid("path_separator cannot be empty"));
        }
        if matches!(&self.filter, Some(filter) if filter.trim().is_empty()) {
            return Err(ConfigError::invalid("filter cannot be blank"));
        }
        Ok(())
    }

    /// Set the path filter
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable fail-fast
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
