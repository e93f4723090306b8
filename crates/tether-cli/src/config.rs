//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tether_agents::PollerConfig;
use tether_core::{Error, Result};

/// Configuration for tether
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where session files are stored (defaults to the local data dir)
    pub sessions_dir: Option<String>,
    pub poller: PollerSettings,
    pub diff: DiffSettings,
}

/// Background agent polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    pub interval_ms: u64,
    /// Consecutive polls without transcript growth before an agent is done
    pub stability_threshold: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        let defaults = PollerConfig::default();
        Self {
            interval_ms: defaults.interval.as_millis() as u64,
            stability_threshold: defaults.stability_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSettings {
    /// Unchanged lines kept around each change
    pub context_lines: usize,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            context_lines: tether_tui::diff::DEFAULT_CONTEXT_LINES,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tether")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("TETHER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poller.interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "poller.interval_ms must be greater than zero".into(),
            ));
        }
        if self.poller.stability_threshold == 0 {
            return Err(Error::InvalidConfig(
                "poller.stability_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> Result<PathBuf> {
        let path = Self::config_path();
        if !path.exists() {
            Self::default().save()?;
        }
        Ok(path)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poller.interval_ms),
            stability_threshold: self.poller.stability_threshold,
        }
    }

    /// Resolved sessions directory
    pub fn sessions_dir(&self) -> PathBuf {
        match self.sessions_dir.as_deref() {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tether")
                .join("sessions"),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# tether configuration file
# Place at ~/.config/tether/config.toml (Linux/Mac) or %APPDATA%\tether\config.toml (Windows)
# or point TETHER_CONFIG_PATH at another file.

# Where saved sessions live (default: <data dir>/tether/sessions)
# sessions_dir = "/path/to/sessions"

[poller]
# Time between background agent transcript polls
interval_ms = 3000
# Polls without new transcript lines before an agent counts as finished
stability_threshold = 2

[diff]
# Unchanged lines shown around each change
context_lines = 3
"#
}
