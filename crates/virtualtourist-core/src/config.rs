//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the Flickr API key, an optional data directory override,
//! the request timeout and the last viewed map camera.
//!
//! Configuration is stored at `~/.config/virtualtourist/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::models::CameraPosition;

/// Application name used for config/data directory paths
const APP_NAME: &str = "virtualtourist";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "FLICKR_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub last_camera: Option<CameraPosition>,
}

impl Config {
    /// Load the config file, or defaults when there is none yet
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// API key from the environment, falling back to the config file
    pub fn api_key(&self) -> Result<String> {
        Self::resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    fn resolve_api_key(from_env: Option<String>, from_config: Option<&str>) -> Result<String> {
        from_env
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                from_config
                    .filter(|key| !key.trim().is_empty())
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No Flickr API key configured. Set {} or add api_key to the config file",
                    API_KEY_ENV
                )
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
