use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Invalid queue configuration, rejected when the manager is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_concurrent must be at least 1")]
    ZeroConcurrency,
}

/// Queue policy: concurrency cap and retry behaviour (`[queue]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of jobs uploading at once.
    pub max_concurrent: usize,
    /// Automatic retries per job after the first attempt fails.
    pub max_retries: u32,
    /// Delay in milliseconds before a failed job becomes eligible again.
    pub retry_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }
}

impl QueueConfig {
    pub fn new(max_concurrent: usize, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_concurrent,
            max_retries,
            retry_delay_ms: retry_delay.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// Where the local store writes uploaded objects (`[storage]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Destination directory; None = `$XDG_DATA_HOME/upq/uploads`.
    pub dest_dir: Option<PathBuf>,
    /// Largest accepted file in bytes.
    pub max_file_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dest_dir: None,
            max_file_bytes: 50 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    /// Configured destination, or the XDG data directory default.
    pub fn resolve_dest_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.dest_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("upq")?;
        Ok(xdg_dirs.get_data_home().join("uploads"))
    }
}

/// Global configuration loaded from `~/.config/upq/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpqConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("upq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Render a config as the TOML written to disk.
pub fn to_toml(cfg: &UpqConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UpqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UpqConfig::default();
        let toml = to_toml(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: UpqConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
