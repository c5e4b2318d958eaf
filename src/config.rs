//! Configuration Management
//!
//! Handles persistent configuration storage for washpro.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use washpro::api::MAX_FETCH_RETRIES;
use washpro::core::DEFAULT_PAGE_SIZE;
use washpro::resource::ResourceKind;

pub const ENV_API_URL: &str = "WASHPRO_API_URL";
pub const ENV_TOKEN: &str = "WASHPRO_TOKEN";

const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

/// Toast and history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_toast_secs")]
    pub toast_duration_secs: u64,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_toast_secs() -> u64 {
    5
}

fn default_max_history() -> usize {
    50
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            toast_duration_secs: default_toast_secs(),
            max_history: default_max_history(),
        }
    }
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the WASH API
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Automatic retries for list fetches
    #[serde(default)]
    pub fetch_retries: u32,
    /// Last viewed resource
    #[serde(default)]
    pub last_resource: Option<String>,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            token: None,
            page_size: default_page_size(),
            request_timeout_secs: default_timeout_secs(),
            fetch_retries: 0,
            last_resource: None,
            notifications: NotificationSettings::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("washpro").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Missing or unreadable files fall back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective API URL (CLI > env > config > default)
    pub fn effective_api_url(&self, cli: Option<&str>) -> String {
        pick(cli, std::env::var(ENV_API_URL).ok(), self.api_base_url.as_deref())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Get effective token (CLI > env > config)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        pick(cli, std::env::var(ENV_TOKEN).ok(), self.token.as_deref())
    }

    /// Get effective start resource (CLI > config > dump sites)
    pub fn effective_resource(&self, cli: Option<&str>) -> Result<ResourceKind> {
        if let Some(key) = cli {
            return ResourceKind::from_key(key)
                .with_context(|| format!("Unknown resource: {}", key));
        }
        Ok(self
            .last_resource
            .as_deref()
            .and_then(ResourceKind::from_key)
            .unwrap_or(ResourceKind::DumpSites))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn effective_fetch_retries(&self) -> u32 {
        self.fetch_retries.min(MAX_FETCH_RETRIES)
    }

    /// Set last resource and save
    pub fn set_last_resource(&mut self, kind: ResourceKind) -> Result<()> {
        self.last_resource = Some(kind.key().to_string());
        self.save()
    }
}

/// First non-blank value in precedence order
fn pick(cli: Option<&str>, env: Option<String>, file: Option<&str>) -> Option<String> {
    cli.map(str::to_string)
        .into_iter()
        .chain(env)
        .chain(file.map(str::to_string))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
