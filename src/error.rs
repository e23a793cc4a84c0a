// src/error.rs
//! Public error type for the entire crate
//!
//! Only programmer errors and local I/O surface here. Sync-time problems
//! (foreign events, wrong key, corrupt payloads) are reported through
//! outcome enums instead, see `oplog::OpOutcome` and `event::VaultEvent`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("vault key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("ciphertext bundle failed authentication")]
    AuthenticationFailure,

    #[error("Crypto operation failed: {0}")]
    Crypto(String),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
