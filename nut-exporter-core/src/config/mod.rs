//! Configuration loading for the exporter
//!
//! The config file is optional. Its format follows the extension: `.toml`
//! and `.json` are parsed as such, anything else as YAML with JSON as a
//! fallback. Keys are camelCase and unknown keys are rejected.

mod settings;

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

pub use settings::{
    ConfigOverrides, DEFAULT_REFRESH_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_UPS_NAME, ExporterConfig,
    is_valid_server,
};

/// Config file read when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "nut.yml";

/// Serialization format of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
    /// Anything else; JSON is tried if YAML fails
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from the file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Raw contents of a config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    /// NUT server host name or IPv4 address
    pub server: Option<String>,
    /// NUT server port
    pub port: Option<u16>,
    /// Device name on the server
    pub ups_name: Option<String>,
    /// Login user
    pub user: Option<String>,
    /// Login password
    pub password: Option<String>,
    /// Poll interval in seconds
    pub refresh: Option<u64>,
    /// Per-command deadline in seconds
    pub timeout: Option<u64>,
}

impl ConfigFile {
    /// Reads `path`. A missing file yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file exists but cannot be read
    /// and [`ConfigError::Parse`] if its content is invalid.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::parse(&content, ConfigFormat::from_path(path)).map_err(|reason| {
            ConfigError::Parse {
                path: path.display().to_string(),
                reason,
            }
        })
    }

    /// Parses config content in the given format
    ///
    /// # Errors
    ///
    /// Returns the deserializer's message on failure. For YAML the message
    /// of the YAML attempt is kept when the JSON fallback fails too.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => match serde_yaml::from_str(content) {
                Ok(file) => Ok(file),
                Err(yaml_err) => serde_json::from_str(content).map_err(|_| yaml_err.to_string()),
            },
        }
    }
}
