// src/oplog.rs
//! Operation log codec: build and parse encrypted op events
//!
//! Stateless. `build_operation` turns a local intent into event content
//! ready to publish; `parse_and_apply` takes untrusted content from the
//! room and, if it validates, decrypts it and hands it to the model.
//! Nothing on the parse path returns an error: a foreign or corrupt event
//! is dropped and the sync loop carries on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::aliases::VaultKey32;
use crate::consts::SCHEMA_VERSION;
use crate::core::{new_op_id, now_millis, open_wire, seal_to_wire, Result};
use crate::enums::OpKind;
use crate::error::CoreError;
use crate::model::{ApplyOutcome, VaultModel};
use crate::schema::{decode_entry, VaultEntry};

/// Op event content as published to the vault room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultOperation {
    pub op_id: String,
    pub device_id: String,
    pub ts: i64,
    pub op: OpKind,
    pub entry_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    pub epoch: u64,
    /// Serialized `CiphertextBundle` of an [`OpPayload`]
    pub ciphertext: String,
}

/// Plaintext sealed inside an op
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpPayload {
    pub schema_version: u32,
    #[serde(default)]
    pub entry: Option<VaultEntry>,
}

/// Decrypted op payload before the entry is trusted
#[derive(Debug, Deserialize)]
struct RawPayload {
    schema_version: u32,
    #[serde(default)]
    entry: Option<Value>,
}

/// Lenient mirror of [`VaultOperation`]: every field optional so a missing
/// field is reported by name instead of as a serde error
#[derive(Debug, Default, Deserialize)]
struct RawOperation {
    op_id: Option<String>,
    device_id: Option<String>,
    ts: Option<i64>,
    op: Option<String>,
    entry_id: Option<String>,
    prev: Option<String>,
    epoch: Option<u64>,
    ciphertext: Option<String>,
}

/// Result of feeding one op event through the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    Applied,
    /// Required field absent, empty or of the wrong type
    Malformed(&'static str),
    /// Bundle did not open under the current key
    Undecryptable,
    /// Decrypted, but not a usable payload
    BadPayload,
    /// Reached the model and was not applied
    Rejected(ApplyOutcome),
}

impl OpOutcome {
    pub fn is_applied(self) -> bool {
        self == OpOutcome::Applied
    }
}

impl VaultOperation {
    /// Validate untrusted event content
    pub fn from_content(content: &Value) -> std::result::Result<Self, &'static str> {
        let raw = RawOperation::deserialize(content).map_err(|_| "content")?;
        let non_empty = |v: Option<String>, field| v.filter(|s| !s.is_empty()).ok_or(field);

        let op_id = non_empty(raw.op_id, "op_id")?;
        let entry_id = non_empty(raw.entry_id, "entry_id")?;
        let ciphertext = non_empty(raw.ciphertext, "ciphertext")?;
        let epoch = raw.epoch.ok_or("epoch")?;
        let ts = raw.ts.ok_or("ts")?;
        let op = raw.op.as_deref().and_then(OpKind::from_wire).ok_or("op")?;

        Ok(Self {
            op_id,
            device_id: raw.device_id.unwrap_or_default(),
            ts,
            op,
            entry_id,
            prev: raw.prev.filter(|p| !p.is_empty()),
            epoch,
            ciphertext,
        })
    }

    pub fn to_content(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Build an op stamped with the current time
pub fn build_operation(
    kind: OpKind,
    entry_id: &str,
    entry: Option<&VaultEntry>,
    prev_op_id: Option<&str>,
    epoch: u64,
    device_id: &str,
    key: &VaultKey32,
) -> Result<VaultOperation> {
    build_operation_at(kind, entry_id, entry, prev_op_id, epoch, device_id, key, now_millis())
}

/// Build an op with an explicit logical timestamp.
///
/// Create/update must carry an entry whose id is `entry_id`. Delete ignores
/// `entry` and seals a placeholder record.
#[allow(clippy::too_many_arguments)]
pub fn build_operation_at(
    kind: OpKind,
    entry_id: &str,
    entry: Option<&VaultEntry>,
    prev_op_id: Option<&str>,
    epoch: u64,
    device_id: &str,
    key: &VaultKey32,
    ts: i64,
) -> Result<VaultOperation> {
    let entry = match kind {
        OpKind::Delete => VaultEntry::placeholder(entry_id, ts),
        OpKind::Create | OpKind::Update => {
            let entry = entry.ok_or_else(|| {
                CoreError::InvalidEntry(format!("{} op needs an entry", kind.as_str()))
            })?;
            if entry.id != entry_id {
                return Err(CoreError::InvalidEntry(format!(
                    "entry id {} does not match op target {entry_id}",
                    entry.id
                )));
            }
            entry.clone()
        }
    };

    let payload = OpPayload {
        schema_version: SCHEMA_VERSION,
        entry: Some(entry),
    };
    let plaintext = serde_json::to_vec(&payload)?;
    let ciphertext = seal_to_wire(&plaintext, key.expose_secret())?;

    Ok(VaultOperation {
        op_id: new_op_id(),
        device_id: device_id.to_owned(),
        ts,
        op: kind,
        entry_id: entry_id.to_owned(),
        prev: prev_op_id.map(str::to_owned),
        epoch,
        ciphertext,
    })
}

/// Validate, decrypt and apply untrusted op content
pub fn parse_and_apply(content: &Value, key: &VaultKey32, model: &mut VaultModel) -> OpOutcome {
    match VaultOperation::from_content(content) {
        Ok(op) => apply_operation(&op, key, model),
        Err(field) => {
            debug!(field, "dropping op event with missing field");
            OpOutcome::Malformed(field)
        }
    }
}

/// Decrypt an already-validated op and apply it
pub fn apply_operation(op: &VaultOperation, key: &VaultKey32, model: &mut VaultModel) -> OpOutcome {
    let plaintext = match open_wire(&op.ciphertext, key.expose_secret()) {
        Ok(p) => p,
        Err(_) => {
            debug!(op_id = %op.op_id, epoch = op.epoch, "op does not open under current key");
            return OpOutcome::Undecryptable;
        }
    };

    let payload: RawPayload = match serde_json::from_slice(&plaintext) {
        Ok(p) => p,
        Err(e) => {
            debug!(op_id = %op.op_id, error = %e, "op payload is not valid JSON");
            return OpOutcome::BadPayload;
        }
    };
    if payload.schema_version > SCHEMA_VERSION {
        debug!(op_id = %op.op_id, schema_version = payload.schema_version, "op payload from a newer schema");
        return OpOutcome::BadPayload;
    }

    let entry = match op.op {
        OpKind::Delete => None,
        OpKind::Create | OpKind::Update => match payload.entry.and_then(decode_entry) {
            Some(entry) => Some(entry),
            None => {
                debug!(op_id = %op.op_id, "create/update payload without a valid entry");
                return OpOutcome::BadPayload;
            }
        },
    };

    match model.apply_op(&op.entry_id, op.op, entry.as_ref(), &op.op_id, op.ts, op.epoch) {
        ApplyOutcome::Applied => OpOutcome::Applied,
        other => OpOutcome::Rejected(other),
    }
}
