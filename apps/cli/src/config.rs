//! CLI configuration.
//!
//! Stored as TOML at `$SLUICE_CONFIG`, or else:
//! - Linux: `~/.config/sluice/config.toml`
//! - Windows: `%APPDATA%/sluice/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sluice_upload::{RetryPolicy, UploadOptions};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "SLUICE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the upload coordinator.
    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,

    /// Owner recorded with every upload.
    #[serde(default = "default_owner_id")]
    pub owner_id: String,

    /// Part size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Parts uploaded at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry settings for individual part steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_coordinator_url() -> String {
    "http://localhost:4000/api".into()
}

fn default_owner_id() -> String {
    "demo-user".into()
}

fn default_chunk_size() -> u64 {
    sluice_transfer::DEFAULT_CHUNK_SIZE
}

fn default_concurrency() -> usize {
    sluice_upload::types::DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_initial_delay_ms() -> u64 {
    RetryPolicy::default().initial_delay.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    RetryPolicy::default().max_delay.as_millis() as u64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator_url: default_coordinator_url(),
            owner_id: default_owner_id(),
            chunk_size: default_chunk_size(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or writes a default there if absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn upload_options(&self) -> UploadOptions {
        let defaults = RetryPolicy::default();
        UploadOptions {
            chunk_size: self.chunk_size,
            concurrency: self.concurrency,
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
                ..defaults
            },
        }
    }
}

/// Returns the configuration file path.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("sluice").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("sluice")
            .join("config.toml")
    }
}
