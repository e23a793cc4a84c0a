// src/export/mod.rs
//! Plaintext export of the vault
//!
//! Everything written here is unencrypted. Callers must warn the user.

pub use json::{export_to_json, export_to_json_string, export_vault, parse_export, VaultExport};

pub mod json;
