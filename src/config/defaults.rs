// src/config/defaults.rs
use std::path::PathBuf;

use crate::config::app::{Features, Paths, SyncSettings};
use crate::consts::{DEFAULT_SNAPSHOT_EVERY_OPS, DEFAULT_UNLOCK_TIMEOUT_MS};

pub const DEFAULT_CONFIG_PATH: &str = "vault-sync.toml";
pub const CONFIG_PATH_ENV: &str = "VAULT_SYNC_CONFIG";
pub const STORE_DB_ENV: &str = "VAULT_SYNC_STORE_DB";

pub fn default_sync() -> SyncSettings {
    SyncSettings {
        unlock_timeout_ms: DEFAULT_UNLOCK_TIMEOUT_MS,
        device_id: None,
        snapshot_every_ops: DEFAULT_SNAPSHOT_EVERY_OPS,
    }
}

pub fn default_paths() -> Paths {
    Paths { store_db: None }
}

pub fn default_features() -> Features {
    Features {
        persist_locally: true,
    }
}

/// `<platform data dir>/vault-sync/store.db`, or a relative path if the
/// platform has no data dir
pub fn default_store_db() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vault-sync")
        .join("store.db")
}
