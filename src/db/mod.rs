// src/db/mod.rs
//! Local on-device row store (SQLite)
//!
//! Mirrors the sync state so a device can show something before the room
//! has synced. Every blob column holds a ciphertext bundle; index columns
//! hold keyed hashes. No plaintext is written.

pub mod store_conn;
pub mod store_ops;

pub use store_conn::{open_memory_store, open_store};
pub use store_ops::*;
