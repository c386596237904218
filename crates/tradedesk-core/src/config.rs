//! Application configuration management.
//!
//! This module handles loading and saving the configuration: the auth
//! server URL, where the session is persisted, and the timing knobs of the
//! login handshake and expiry watcher.
//!
//! Configuration is stored at `~/.config/tradedesk/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStorage, KeyringStorage, PopupConfig, Storage};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tradedesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Upper bound for `session_lifetime_hours` (one year)
const MAX_SESSION_LIFETIME_HOURS: i64 = 24 * 365;

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "TRADEDESK_API_URL";

/// Where the session blob is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage: StorageBackend,
    /// Lifetime of sessions the provider does not put an expiry on.
    pub session_lifetime_hours: i64,
    pub expiry_check_secs: u64,
    pub popup_poll_ms: u64,
    /// 0 disables the login timeout.
    pub login_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            storage: StorageBackend::File,
            session_lifetime_hours: 24,
            expiry_check_secs: 60,
            popup_poll_ms: 1000,
            login_timeout_secs: 300,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        config.clamp_session_lifetime();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
    }

    fn clamp_session_lifetime(&mut self) {
        let clamped = self
            .session_lifetime_hours
            .clamp(1, MAX_SESSION_LIFETIME_HOURS);
        if clamped != self.session_lifetime_hours {
            tracing::warn!(
                configured = self.session_lifetime_hours,
                using = clamped,
                "session_lifetime_hours out of range"
            );
            self.session_lifetime_hours = clamped;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Build the configured session storage backend.
    pub fn storage(&self) -> Result<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = match self.storage {
            StorageBackend::File => Arc::new(FileStorage::new(self.cache_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStorage::new(APP_NAME)),
        };
        Ok(storage)
    }

    /// Session lifetime, clamped to between one hour and one year.
    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(
            self.session_lifetime_hours
                .clamp(1, MAX_SESSION_LIFETIME_HOURS),
        )
    }

    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_check_secs.max(1))
    }

    pub fn popup_config(&self) -> PopupConfig {
        PopupConfig {
            poll_interval: Duration::from_millis(self.popup_poll_ms.max(100)),
            timeout: (self.login_timeout_secs > 0)
                .then(|| Duration::from_secs(self.login_timeout_secs)),
            ..PopupConfig::default()
        }
    }
}
