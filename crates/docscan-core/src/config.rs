//! Application configuration
//!
//! Settings come from three layers, later ones winning:
//! defaults, `~/.config/docscan/config.toml` (or `$DOCSCAN_CONFIG`), and
//! `DOCSCAN_*` environment variables.
//!
//! Loading has no side effects; the data directory is created when the
//! database is opened.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides `data_dir`
pub const ENV_DATA_DIR: &str = "DOCSCAN_DATA_DIR";
/// Overrides `database_name`; ignored when empty
pub const ENV_DATABASE: &str = "DOCSCAN_DATABASE";
/// Overrides `log_level`; empty clears it
pub const ENV_LOG: &str = "DOCSCAN_LOG";
/// Location of the config file itself
pub const ENV_CONFIG: &str = "DOCSCAN_CONFIG";

/// Default database file name inside the data directory
pub const DEFAULT_DATABASE_NAME: &str = "document_database";

/// Keys accepted by [`Config::set`]
pub const KEYS: &[&str] = &["data_dir", "database_name", "log_level"];

/// Where docscan keeps its data and how loudly it logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Holds the database and the capture folders
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// `tracing` filter directive for the CLI, e.g. "info"
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_name: default_database_name(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load from the default config file and the process environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path` (defaults if it does not exist), then apply the
    /// process environment
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Only what `path` says (defaults if it does not exist); the
    /// environment is ignored, so saving this back persists no overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load from TOML text, then apply the process environment
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config = Self::parse(toml_content)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn parse(toml_content: &str) -> Result<Self> {
        toml::from_str(toml_content).context("Failed to parse config TOML")
    }

    /// Apply `DOCSCAN_*` overrides read through `lookup`
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup(ENV_DATABASE).filter(|n| !n.is_empty()) {
            self.database_name = name;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log_level = Some(level).filter(|l| !l.is_empty());
        }
    }

    /// Change one setting by key; "none" or "" clears `log_level`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "database_name" => {
                if value.is_empty() || value.contains(&['/', '\\'][..]) {
                    bail!("database_name must be a plain file name, got '{}'", value);
                }
                self.database_name = value.to_string();
            }
            "log_level" => {
                self.log_level = match value {
                    "" | "none" => None,
                    level => Some(level.to_string()),
                };
            }
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// `$DOCSCAN_CONFIG`, else `<config dir>/docscan/config.toml`
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docscan")
            .join("config.toml")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_name)
    }

    /// Parent of the per-session capture folders
    pub fn captures_dir(&self) -> PathBuf {
        self.data_dir.join("captures")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docscan")
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}
