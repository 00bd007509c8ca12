//! Client configuration at `~/.tscript/config.toml`.
//!
//! Provides default transcript filename and shell settings. CLI flags
//! always override config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default session settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Default session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Shell to run in the session (empty = use `$SHELL`).
    #[serde(default)]
    pub shell: String,

    /// Transcript filename used when none is given on the command line.
    #[serde(default = "default_transcript")]
    pub transcript: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            shell: String::new(),
            transcript: default_transcript(),
        }
    }
}

fn default_transcript() -> String {
    "typescript".to_string()
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    #[allow(dead_code)]
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;

        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;

        Ok(())
    }
}
