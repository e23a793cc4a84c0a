// src/rotation.rs
//! Vault key rotation
//!
//! `prepare_rotation` is the pure planning step. `rotate_vault_key` does the
//! crypto half on top of it: fresh key, every entry re-sealed into a snapshot
//! under that key. Publishing the snapshot, updating escrow and bumping the
//! epoch in metadata belong to the caller (see `session::VaultSession::rotate`).
//! Once a model adopts the new epoch, ops still tagged with the old one are
//! ignored by `VaultModel::apply_op`.

use crate::aliases::VaultKey32;
use crate::core::{generate_vault_key, Result};
use crate::model::VaultModel;
use crate::schema::VaultEntry;
use crate::snapshot::{build_snapshot_event, SnapshotEventContent};

/// Entries to carry over and the epoch they will live under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan {
    pub entries: Vec<VaultEntry>,
    pub new_epoch: u64,
}

pub fn prepare_rotation(model: &VaultModel) -> RotationPlan {
    RotationPlan {
        entries: model.list_entries(),
        new_epoch: model.epoch() + 1,
    }
}

/// Result of re-encrypting the vault under a new key
pub struct RotationOutcome {
    pub new_key: VaultKey32,
    pub new_epoch: u64,
    pub entries: Vec<VaultEntry>,
    /// Snapshot sealed under `new_key`, tagged with `new_epoch`
    pub snapshot: SnapshotEventContent,
}

/// Pure crypto rotation: no transport, no model mutation
pub fn rotate_vault_key(model: &VaultModel, base_op_id: Option<&str>) -> Result<RotationOutcome> {
    let plan = prepare_rotation(model);
    let new_key = generate_vault_key();
    let snapshot = build_snapshot_event(&plan.entries, plan.new_epoch, base_op_id, &new_key)?;
    Ok(RotationOutcome {
        new_key,
        new_epoch: plan.new_epoch,
        entries: plan.entries,
        snapshot,
    })
}
