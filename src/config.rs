//! Configuration management for Tangerine
//!
//! This module handles the small persistent configuration document that
//! remembers the last used model reference between runs. The document is a
//! single JSON file; a missing or unreadable file is treated as an empty
//! configuration so startup never fails on config problems.

use crate::error::{Result, TangerineError};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location
///
/// This makes it easy to point the binary at a test config without
/// changing the user's configuration directory.
pub const CONFIG_FILE_ENV: &str = "TANGERINE_CONFIG_FILE";

/// Persistent configuration document
///
/// Stored as `config.json` in the platform configuration directory. The
/// remembered model reference is used to pre-fill the model selection at
/// startup; it is never loaded automatically.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Model reference used by the most recent successful load
    #[serde(default)]
    pub last_model: Option<String>,
}

impl Config {
    /// Resolve the config file path
    ///
    /// Honors the `TANGERINE_CONFIG_FILE` environment variable; otherwise
    /// uses `config.json` under the platform configuration directory.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(override_path) = std::env::var(CONFIG_FILE_ENV) {
            return Ok(PathBuf::from(override_path));
        }

        let proj_dirs = ProjectDirs::from("com", "tangerine", "tangerine").ok_or_else(|| {
            TangerineError::Config("Could not determine configuration directory".into())
        })?;

        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Load the configuration from the default location
    ///
    /// A missing, unreadable, or malformed file yields the default (empty)
    /// configuration rather than an error.
    pub fn load() -> Self {
        match Self::default_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                tracing::debug!("Config path unavailable: {}", e);
                Self::default()
            }
        }
    }

    /// Load the configuration from a specific path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config file
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::config::Config;
    ///
    /// let config = Config::load_from("/nonexistent/config.json");
    /// assert!(config.last_model.is_none());
    /// ```
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::debug!("Ignoring malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::debug!("No config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save the configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save the configuration to a specific path
    ///
    /// Creates parent directories as needed and writes pretty-printed JSON.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination path for the config file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))
                .map_err(|e| TangerineError::Config(e.to_string()))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")
            .map_err(|e| TangerineError::Config(e.to_string()))?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config {}", path.display()))
            .map_err(|e| TangerineError::Config(e.to_string()))?;

        Ok(())
    }
}
