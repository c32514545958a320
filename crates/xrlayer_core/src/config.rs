//! Environment-driven layer configuration.
//!
//! # Responsibility
//! - Resolve log settings and capability policy overrides once per process.
//!
//! # Invariants
//! - Lookups go through an injectable function; tests never touch process env.
//! - Unset or blank variables fall back to compiled-in defaults.

use crate::extension::registry::ExtensionEntry;
use crate::logging::default_log_level;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "XRLAYER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "XRLAYER_LOG_DIR";
pub const ENV_ADVERTISED_EXTENSIONS: &str = "XRLAYER_ADVERTISED_EXTENSIONS";
pub const ENV_IMPLICIT_EXTENSIONS: &str = "XRLAYER_IMPLICIT_EXTENSIONS";
pub const ENV_BLOCKED_EXTENSIONS: &str = "XRLAYER_BLOCKED_EXTENSIONS";

const DEFAULT_LOG_DIR_NAME: &str = "xrlayer-logs";
const DEFAULT_EXTENSION_VERSION: u32 = 1;

/// Resolved configuration for the process-wide layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerConfig {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub advertised_extensions: Vec<ExtensionEntry>,
    pub implicit_extensions: Vec<String>,
    pub blocked_extensions: Vec<String>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
            advertised_extensions: Vec::new(),
            implicit_extensions: Vec::new(),
            blocked_extensions: Vec::new(),
        }
    }
}

impl LayerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(raw) = read(ENV_ADVERTISED_EXTENSIONS) {
            config.advertised_extensions = parse_extension_list(&raw)?;
        }
        if let Some(raw) = read(ENV_IMPLICIT_EXTENSIONS) {
            config.implicit_extensions = parse_name_list(&raw);
        }
        if let Some(raw) = read(ENV_BLOCKED_EXTENSIONS) {
            config.blocked_extensions = parse_name_list(&raw);
        }
        Ok(config)
    }
}

fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_extension_list(raw: &str) -> Result<Vec<ExtensionEntry>, ConfigError> {
    parse_name_list(raw)
        .into_iter()
        .map(|item| match item.split_once(':') {
            None => Ok(ExtensionEntry::new(item, DEFAULT_EXTENSION_VERSION)),
            Some((name, version)) => version
                .trim()
                .parse::<u32>()
                .map(|version| ExtensionEntry::new(name.trim(), version))
                .map_err(|_| ConfigError::InvalidExtensionVersion(item.clone())),
        })
        .collect()
}

/// Configuration parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidExtensionVersion(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidExtensionVersion(entry) => write!(
                f,
                "extension entry `{entry}` has an invalid version (expected NAME[:VERSION])"
            ),
        }
    }
}

impl Error for ConfigError {}
