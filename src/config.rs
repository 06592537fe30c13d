// Shadow Exec Configuration Module
//
// This module handles loading and parsing the configuration from shadow-exec.yaml

use crate::policy::DEFAULT_STRICT_VALUE;
use crate::store::{Engine, FileStore};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "shadow-exec.yaml";

/// Environment variable overriding the store path.
pub const STORE_ENV: &str = "SHADOW_EXEC_STORE";

/// Environment variable switching to flat (verbatim) secret keys when set.
pub const NO_PATHS_ENV: &str = "SHADOW_EXEC_NO_PATHS";

/// Secret store configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory holding one secrets document per service
    #[serde(default = "default_store_path")]
    pub path: String,

    /// How documents are read ("file" or "sops")
    #[serde(default = "default_engine")]
    pub engine: String,
}

fn default_store_path() -> String {
    "~/.shadow-exec/store".to_string()
}

fn default_engine() -> String {
    "file".to_string()
}

fn default_strict_value() -> String {
    DEFAULT_STRICT_VALUE.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            engine: default_engine(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Secret store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Sentinel value expected in strict mode
    #[serde(default = "default_strict_value")]
    pub strict_value: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            strict_value: default_strict_value(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Load configuration for a run.
    ///
    /// An explicit path must exist. Without one, `shadow-exec.yaml` in the
    /// current directory is used if present, and defaults otherwise. The
    /// store path from `SHADOW_EXEC_STORE` overrides the file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        if let Ok(store) = std::env::var(STORE_ENV) {
            if !store.is_empty() {
                config.store.path = store;
            }
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.path.is_empty() {
            anyhow::bail!("Store path cannot be empty");
        }

        self.engine()?;

        if self.strict_value.is_empty() {
            anyhow::bail!("Strict value cannot be empty");
        }

        Ok(())
    }

    pub fn engine(&self) -> Result<Engine> {
        self.store
            .engine
            .parse::<Engine>()
            .map_err(|e| anyhow::anyhow!(e))
    }

    /// Get the absolute path for the store directory
    pub fn store_path(&self) -> Result<PathBuf> {
        let path = Path::new(&self.store.path);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        // Expand ~ to home directory if present
        if let Some(rest) = self.store.path.strip_prefix('~') {
            let home = dirs::home_dir().context("Failed to determine home directory")?;
            let rest = rest.trim_start_matches(['/', '\\']);
            return Ok(home.join(rest));
        }

        std::env::current_dir()
            .map(|dir| dir.join(&self.store.path))
            .with_context(|| "Failed to get current directory")
    }

    /// Build the secret store described by this configuration.
    pub fn open_store(&self) -> Result<FileStore> {
        Ok(FileStore::new(self.store_path()?, self.engine()?))
    }
}

/// Whether flat key mode was requested through the environment.
pub fn no_paths_from_env() -> bool {
    std::env::var_os(NO_PATHS_ENV).is_some()
}
