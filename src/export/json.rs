// src/export/json.rs
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::model::VaultModel;
use crate::schema::VaultEntry;

pub const EXPORT_FORMAT: &str = "vault-sync-export-v1";

const PLAINTEXT_WARNING: &str =
    "THIS FILE CONTAINS EVERY VAULT ENTRY IN PLAINTEXT. ENCRYPT OR DELETE IT AFTER USE.";

/// Portable plaintext dump of a vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultExport {
    pub version: u32,
    #[serde(default)]
    pub export_format: String,
    pub epoch: u64,
    /// RFC 3339, seconds precision
    pub exported_at: String,
    #[serde(default)]
    pub warning: String,
    pub entries: Vec<VaultEntry>,
}

/// Copy the model into an export document, entries sorted by title then id
pub fn export_vault(model: &VaultModel) -> VaultExport {
    let mut entries = model.list_entries();
    entries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
    VaultExport {
        version: crate::consts::SCHEMA_VERSION,
        export_format: EXPORT_FORMAT.to_string(),
        epoch: model.epoch(),
        exported_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        warning: PLAINTEXT_WARNING.to_string(),
        entries,
    }
}

pub fn export_to_json_string(model: &VaultModel) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export_vault(model))?)
}

/// Write the export to `path`. The file holds plaintext secrets.
pub fn export_to_json(model: &VaultModel, path: impl AsRef<Path>) -> Result<usize> {
    let export = export_vault(model);
    std::fs::write(path.as_ref(), serde_json::to_string_pretty(&export)?)?;
    warn!(
        path = %path.as_ref().display(),
        entries = export.entries.len(),
        "plaintext vault export written"
    );
    Ok(export.entries.len())
}

/// Read an export back. A document without an `entries` array is rejected.
pub fn parse_export(json: &str) -> Result<VaultExport> {
    let value: Value = serde_json::from_str(json)?;
    if !value.get("entries").is_some_and(Value::is_array) {
        return Err(CoreError::InvalidEntry("export has no entries array".into()));
    }
    Ok(serde_json::from_value(value)?)
}
