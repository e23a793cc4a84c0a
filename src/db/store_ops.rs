// src/db/store_ops.rs
//! Row-level operations on the local store
//!
//! Rows are opaque to the store: entries are sealed under the vault key
//! before they get here, ops and snapshots keep the ciphertext they
//! arrived with.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::aliases::VaultKey32;
use crate::consts::{SCHEMA_VERSION, VAULT_STATE_ROW_ID};
use crate::core::{keyed_index, open_wire, seal_to_wire};
use crate::error::Result;
use crate::oplog::VaultOperation;
use crate::schema::VaultEntry;
use crate::snapshot::SnapshotEventContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub entry_id: String,
    pub encrypted_entry_blob: String,
    pub last_op_id: String,
    pub folder_id: Option<String>,
    pub title_index: String,
    pub url_index: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpRow {
    pub op_id: String,
    pub entry_id: String,
    pub op_type: String,
    pub epoch: u64,
    pub encrypted_op_blob: String,
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub snapshot_id: String,
    pub epoch: u64,
    pub mxc_url: String,
    pub hash: String,
    pub size: u64,
    pub encrypted_snapshot_meta: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStateRow {
    pub latest_applied_op_id: Option<String>,
    pub latest_snapshot_id: Option<String>,
    pub epoch: u64,
    pub schema_version: u32,
}

// ──────────────────────────────────────────────────────────────
// Entries
// ──────────────────────────────────────────────────────────────

/// Seal an entry for local storage and compute its index columns
pub fn entry_row_for(entry: &VaultEntry, last_op_id: &str, key: &VaultKey32) -> Result<EntryRow> {
    let plaintext = serde_json::to_vec(entry)?;
    let host = entry
        .url
        .as_deref()
        .and_then(|u| url::Url::parse(u).ok())
        .and_then(|u| u.host_str().map(str::to_owned));
    Ok(EntryRow {
        entry_id: entry.id.clone(),
        encrypted_entry_blob: seal_to_wire(&plaintext, key.expose_secret())?,
        last_op_id: last_op_id.to_owned(),
        folder_id: entry.folder_id.clone(),
        title_index: keyed_index(key.expose_secret(), &entry.title),
        url_index: host.map(|h| keyed_index(key.expose_secret(), &h)),
        updated_at: entry.updated_at,
    })
}

/// Open a stored entry; `None` if it was sealed under another key
pub fn decrypt_entry_row(row: &EntryRow, key: &VaultKey32) -> Option<VaultEntry> {
    let plaintext = open_wire(&row.encrypted_entry_blob, key.expose_secret()).ok()?;
    serde_json::from_slice(&plaintext).ok()
}

pub fn put_entry_row(conn: &Connection, row: &EntryRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO vault_entries (
            entry_id, encrypted_entry_blob, last_op_id,
            folder_id, title_index, url_index, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            &row.entry_id,
            &row.encrypted_entry_blob,
            &row.last_op_id,
            &row.folder_id,
            &row.title_index,
            &row.url_index,
            row.updated_at,
        ],
    )?;
    Ok(())
}

pub fn delete_entry_row(conn: &Connection, entry_id: &str) -> Result<()> {
    conn.execute("DELETE FROM vault_entries WHERE entry_id = ?1", [entry_id])?;
    Ok(())
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        entry_id: row.get(0)?,
        encrypted_entry_blob: row.get(1)?,
        last_op_id: row.get(2)?,
        folder_id: row.get(3)?,
        title_index: row.get(4)?,
        url_index: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn get_entry_row(conn: &Connection, entry_id: &str) -> Result<Option<EntryRow>> {
    let row = conn
        .query_row(
            "SELECT entry_id, encrypted_entry_blob, last_op_id, folder_id, title_index, url_index, updated_at
             FROM vault_entries WHERE entry_id = ?1",
            [entry_id],
            entry_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn all_entry_rows(conn: &Connection) -> Result<Vec<EntryRow>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, encrypted_entry_blob, last_op_id, folder_id, title_index, url_index, updated_at
         FROM vault_entries ORDER BY updated_at DESC",
    )?;
    let rows = stmt
        .query_map([], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Entries whose title index matches `title` exactly (case-insensitive)
pub fn entry_rows_by_title(conn: &Connection, title: &str, key: &VaultKey32) -> Result<Vec<EntryRow>> {
    let index = keyed_index(key.expose_secret(), title);
    let mut stmt = conn.prepare(
        "SELECT entry_id, encrypted_entry_blob, last_op_id, folder_id, title_index, url_index, updated_at
         FROM vault_entries WHERE title_index = ?1",
    )?;
    let rows = stmt
        .query_map([index], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Drop every entry row (before re-seeding from a snapshot or a new key)
pub fn clear_entry_rows(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM vault_entries", [])?;
    Ok(())
}

// ──────────────────────────────────────────────────────────────
// Ops
// ──────────────────────────────────────────────────────────────

pub fn op_row_for(op: &VaultOperation) -> OpRow {
    OpRow {
        op_id: op.op_id.clone(),
        entry_id: op.entry_id.clone(),
        op_type: op.op.as_str().to_owned(),
        epoch: op.epoch,
        encrypted_op_blob: op.ciphertext.clone(),
        ts: op.ts,
    }
}

/// Insert an op row; replaying the same op id is a no-op
pub fn put_op_row(conn: &Connection, row: &OpRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR IGNORE INTO vault_ops (op_id, entry_id, op_type, epoch, encrypted_op_blob, ts)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            &row.op_id,
            &row.entry_id,
            &row.op_type,
            row.epoch as i64,
            &row.encrypted_op_blob,
            row.ts,
        ],
    )?;
    Ok(())
}

/// Ops recorded for one entry, oldest first
pub fn ops_for_entry(conn: &Connection, entry_id: &str) -> Result<Vec<OpRow>> {
    let mut stmt = conn.prepare(
        "SELECT op_id, entry_id, op_type, epoch, encrypted_op_blob, ts
         FROM vault_ops WHERE entry_id = ?1 ORDER BY ts, op_id",
    )?;
    let rows = stmt
        .query_map([entry_id], |row| {
            Ok(OpRow {
                op_id: row.get(0)?,
                entry_id: row.get(1)?,
                op_type: row.get(2)?,
                epoch: row.get::<_, i64>(3)? as u64,
                encrypted_op_blob: row.get(4)?,
                ts: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ──────────────────────────────────────────────────────────────
// Snapshots
// ──────────────────────────────────────────────────────────────

pub fn snapshot_row_for(snapshot: &SnapshotEventContent) -> SnapshotRow {
    SnapshotRow {
        snapshot_id: snapshot.snapshot_id.clone(),
        epoch: snapshot.epoch,
        mxc_url: snapshot.blob.mxc_url.clone(),
        hash: snapshot.blob.hash.clone(),
        size: snapshot.blob.size,
        encrypted_snapshot_meta: snapshot.ciphertext.clone(),
    }
}

pub fn put_snapshot_row(conn: &Connection, row: &SnapshotRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO vault_snapshots (
            snapshot_id, epoch, mxc_url, hash, size, encrypted_snapshot_meta
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            &row.snapshot_id,
            row.epoch as i64,
            &row.mxc_url,
            &row.hash,
            row.size as i64,
            &row.encrypted_snapshot_meta,
        ],
    )?;
    Ok(())
}

pub fn get_snapshot_row(conn: &Connection, snapshot_id: &str) -> Result<Option<SnapshotRow>> {
    let row = conn
        .query_row(
            "SELECT snapshot_id, epoch, mxc_url, hash, size, encrypted_snapshot_meta
             FROM vault_snapshots WHERE snapshot_id = ?1",
            [snapshot_id],
            |row| {
                Ok(SnapshotRow {
                    snapshot_id: row.get(0)?,
                    epoch: row.get::<_, i64>(1)? as u64,
                    mxc_url: row.get(2)?,
                    hash: row.get(3)?,
                    size: row.get::<_, i64>(4)? as u64,
                    encrypted_snapshot_meta: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

// ──────────────────────────────────────────────────────────────
// Sync state (singleton)
// ──────────────────────────────────────────────────────────────

pub fn get_vault_state(conn: &Connection) -> Result<Option<VaultStateRow>> {
    let row = conn
        .query_row(
            "SELECT latest_applied_op_id, latest_snapshot_id, epoch, schema_version
             FROM vault_state WHERE id = ?1",
            [VAULT_STATE_ROW_ID],
            |row| {
                Ok(VaultStateRow {
                    latest_applied_op_id: row.get(0)?,
                    latest_snapshot_id: row.get(1)?,
                    epoch: row.get::<_, i64>(2)? as u64,
                    schema_version: row.get::<_, i64>(3)? as u32,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn set_vault_state(conn: &Connection, state: &VaultStateRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO vault_state (
            id, latest_applied_op_id, latest_snapshot_id, epoch, schema_version
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            VAULT_STATE_ROW_ID,
            &state.latest_applied_op_id,
            &state.latest_snapshot_id,
            state.epoch as i64,
            state.schema_version as i64,
        ],
    )?;
    Ok(())
}

/// Create the singleton row if it does not exist yet; returns the current row
pub fn init_vault_state(conn: &Connection, epoch: u64) -> Result<VaultStateRow> {
    if let Some(existing) = get_vault_state(conn)? {
        return Ok(existing);
    }
    let state = VaultStateRow {
        latest_applied_op_id: None,
        latest_snapshot_id: None,
        epoch,
        schema_version: SCHEMA_VERSION,
    };
    set_vault_state(conn, &state)?;
    Ok(state)
}
