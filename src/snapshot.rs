// src/snapshot.rs
//! Snapshot codec: encrypted full-state checkpoints
//!
//! A snapshot lets unlock skip replaying the whole op log. Building seals
//! every entry under the vault key; parsing follows the same drop-don't-fail
//! discipline as the op codec and returns `None` on any problem.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::aliases::VaultKey32;
use crate::consts::{SCHEMA_VERSION, SNAPSHOT_MARKER_PREFIX};
use crate::core::{blake3_hex, new_op_id, now_millis, open_wire, seal_to_wire, Result};
use crate::model::{VaultModel, Winner};
use crate::schema::{decode_entry, VaultEntry};

/// Plaintext sealed inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub schema_version: u32,
    pub entries: Vec<VaultEntry>,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_notes: Option<String>,
}

/// Decrypted snapshot payload before the entries are trusted
#[derive(Debug, Deserialize)]
struct RawSnapshotPayload {
    schema_version: u32,
    entries: Vec<Value>,
}

/// Integrity bookkeeping for the sealed snapshot blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SnapshotBlob {
    /// Out-of-band upload location, empty when the ciphertext travels inline
    #[serde(default)]
    pub mxc_url: String,
    pub size: u64,
    /// BLAKE3 hex of the serialized ciphertext
    pub hash: String,
}

/// Snapshot event content as published to the vault room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEventContent {
    #[serde(default)]
    pub snapshot_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_op_id: Option<String>,
    #[serde(default)]
    pub epoch: u64,
    #[serde(default)]
    pub blob: SnapshotBlob,
    #[serde(default)]
    pub ciphertext: String,
}

/// Output of [`build_snapshot`]
#[derive(Debug, Clone)]
pub struct BuiltSnapshot {
    pub ciphertext: String,
    pub payload: SnapshotPayload,
}

impl SnapshotEventContent {
    /// Validate untrusted event content: needs a ciphertext and a non-zero
    /// epoch, and a recorded hash (if any) must match the ciphertext
    pub fn from_content(content: &Value) -> Option<Self> {
        let parsed = Self::deserialize(content).ok()?;
        if parsed.ciphertext.is_empty() || parsed.epoch == 0 {
            return None;
        }
        if !parsed.blob.hash.is_empty() && parsed.blob.hash != blake3_hex(parsed.ciphertext.as_bytes()) {
            debug!(snapshot_id = %parsed.snapshot_id, "snapshot hash mismatch");
            return None;
        }
        Some(parsed)
    }

    pub fn to_content(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Seal the full entry set
pub fn build_snapshot(entries: &[VaultEntry], key: &VaultKey32) -> Result<BuiltSnapshot> {
    let payload = SnapshotPayload {
        schema_version: SCHEMA_VERSION,
        entries: entries.to_vec(),
        created_at: now_millis(),
        snapshot_notes: None,
    };
    let plaintext = serde_json::to_vec(&payload)?;
    let ciphertext = seal_to_wire(&plaintext, key.expose_secret())?;
    Ok(BuiltSnapshot { ciphertext, payload })
}

/// Seal the entry set and wrap it as publishable event content
pub fn build_snapshot_event(
    entries: &[VaultEntry],
    epoch: u64,
    base_op_id: Option<&str>,
    key: &VaultKey32,
) -> Result<SnapshotEventContent> {
    let built = build_snapshot(entries, key)?;
    Ok(SnapshotEventContent {
        snapshot_id: new_op_id(),
        base_op_id: base_op_id.map(str::to_owned),
        epoch,
        blob: SnapshotBlob {
            mxc_url: String::new(),
            size: built.ciphertext.len() as u64,
            hash: blake3_hex(built.ciphertext.as_bytes()),
        },
        ciphertext: built.ciphertext,
    })
}

/// Open a serialized snapshot bundle. `None` on any failure.
pub fn parse_snapshot(ciphertext: &str, key: &VaultKey32) -> Option<Vec<VaultEntry>> {
    let plaintext = match open_wire(ciphertext, key.expose_secret()) {
        Ok(p) => p,
        Err(_) => {
            debug!("snapshot does not open under current key");
            return None;
        }
    };
    let payload = match serde_json::from_slice::<RawSnapshotPayload>(&plaintext) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "snapshot payload is not valid JSON");
            return None;
        }
    };
    if payload.schema_version > SCHEMA_VERSION {
        debug!(schema_version = payload.schema_version, "snapshot from a newer schema");
        return None;
    }
    let entries: Option<Vec<VaultEntry>> = payload.entries.into_iter().map(decode_entry).collect();
    if entries.is_none() {
        debug!("snapshot holds a malformed entry");
    }
    entries
}

/// Validate and open snapshot event content.
///
/// Returns the validated content alongside its decrypted entries.
pub fn parse_snapshot_content(
    content: &Value,
    key: &VaultKey32,
) -> Option<(SnapshotEventContent, Vec<VaultEntry>)> {
    let snapshot = SnapshotEventContent::from_content(content)?;
    let entries = parse_snapshot(&snapshot.ciphertext, key)?;
    Some((snapshot, entries))
}

/// Synthetic winner id for a snapshot-restored entry.
///
/// Generated op ids are UUIDs and never start with `!`, so a marker can't
/// collide with one, and it loses every timestamp tie.
pub fn snapshot_marker(entry_id: &str) -> String {
    format!("{SNAPSHOT_MARKER_PREFIX}{entry_id}")
}

pub fn is_snapshot_marker(op_id: &str) -> bool {
    op_id.starts_with(SNAPSHOT_MARKER_PREFIX)
}

/// Destructively replace model state with a snapshot taken at `epoch`
pub fn apply_snapshot_to_model(model: &mut VaultModel, entries: &[VaultEntry], epoch: u64) {
    model.replace_all(
        entries.iter().map(|e| {
            let winner = Winner {
                op_id: snapshot_marker(&e.id),
                ts: e.updated_at,
            };
            (e.clone(), winner)
        }),
        epoch,
    );
}
