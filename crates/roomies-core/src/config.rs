//! Client configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the backend URL, the request timeout, where the session token is
//! kept and the last used username.
//!
//! Configuration is stored at `~/.config/roomies/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::REQUEST_TIMEOUT_SECS;

/// Application name used for config directory paths
pub const APP_NAME: &str = "roomies";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when neither the environment nor the config file name one
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "ROOMIES_API_URL";

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStorage {
    /// OS keychain
    #[default]
    Keyring,
    /// Plain file in the config directory
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub session_storage: SessionStorage,
    #[serde(default)]
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Backend base URL: `ROOMIES_API_URL`, then the config file, then the
    /// default.
    pub fn api_url(&self) -> String {
        self.resolve_api_url(std::env::var(API_URL_ENV).ok())
    }

    fn resolve_api_url(&self, env_override: Option<String>) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .filter(|&secs| secs > 0)
            .unwrap_or(REQUEST_TIMEOUT_SECS)
    }
}
