// src/config/app.rs
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use super::defaults::*;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_sync")]
    pub sync: SyncSettings,
    #[serde(default = "default_paths")]
    pub paths: Paths,
    #[serde(default = "default_features")]
    pub features: Features,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Ceiling on waiting for the room timeline during unlock
    pub unlock_timeout_ms: u64,
    /// Stable device id; a random one is used per session when unset
    pub device_id: Option<String>,
    /// Applied-op count after which a compaction is suggested
    pub snapshot_every_ops: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub store_db: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Features {
    pub persist_locally: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        default_sync()
    }
}

impl Default for Paths {
    fn default() -> Self {
        default_paths()
    }
}

impl Default for Features {
    fn default() -> Self {
        default_features()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sync: default_sync(),
            paths: default_paths(),
            features: default_features(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn unlock_timeout(&self) -> Duration {
        Duration::from_millis(self.sync.unlock_timeout_ms)
    }

    /// Local store path: `VAULT_SYNC_STORE_DB`, then `paths.store_db`,
    /// then the platform default
    pub fn store_db_path(&self) -> PathBuf {
        std::env::var_os(STORE_DB_ENV)
            .map(PathBuf::from)
            .or_else(|| self.paths.store_db.clone())
            .unwrap_or_else(default_store_db)
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load config once per process; falls back to defaults if the file is
/// missing or invalid
pub fn load() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if !Path::new(&config_path).exists() {
            warn!(path = %config_path, "config file not found, using built-in defaults");
            return Config::default();
        }
        match Config::from_path(&config_path) {
            Ok(conf) => conf,
            Err(e) => {
                warn!(path = %config_path, error = %e, "invalid config, using built-in defaults");
                Config::default()
            }
        }
    })
}
