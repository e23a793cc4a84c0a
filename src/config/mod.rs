// src/config/mod.rs
//! Configuration system for vault-sync-core
//!
//! Lazy-loaded config with TOML + env overrides. `load()` is for binaries;
//! library callers can build a `Config` explicitly and pass it around.

pub use app::{load, Config, Features, Paths, SyncSettings};

mod app;
mod defaults;
