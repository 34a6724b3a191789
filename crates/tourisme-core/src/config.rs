//! Application configuration management.
//!
//! This module handles loading and saving the configuration: backend URL,
//! API token, cache time-to-live and request timeout.
//!
//! Configuration is stored at `~/.config/tourisme/config.json`; environment
//! variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::cache::DEFAULT_TTL_MINUTES;

/// Application name used for config directory paths
const APP_NAME: &str = "tourisme";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:8080/api";

pub const ENV_API_URL: &str = "TOURISME_API_URL";
pub const ENV_API_TOKEN: &str = "TOURISME_API_TOKEN";
pub const ENV_CACHE_TTL_SECS: &str = "TOURISME_CACHE_TTL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TOURISME_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            cache_ttl_secs: (DEFAULT_TTL_MINUTES * 60) as u64,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
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

    /// Apply overrides from `lookup` (normally the process environment).
    /// Unparseable numbers are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.is_empty()) {
            self.api_token = Some(token);
        }
        if let Some(raw) = lookup(ENV_CACHE_TTL_SECS) {
            match raw.parse() {
                Ok(secs) => self.cache_ttl_secs = secs,
                Err(_) => warn!(var = ENV_CACHE_TTL_SECS, value = %raw, "Ignoring invalid number"),
            }
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            match raw.parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => {
                    warn!(var = ENV_REQUEST_TIMEOUT_SECS, value = %raw, "Ignoring invalid number")
                }
            }
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        // chrono durations are bounded by i64 milliseconds
        let secs = self.cache_ttl_secs.min(i64::MAX as u64 / 1000) as i64;
        chrono::Duration::seconds(secs)
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
