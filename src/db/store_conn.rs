// src/db/store_conn.rs
use std::{fs, path::Path};

use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vault_entries (
        entry_id             TEXT PRIMARY KEY,
        encrypted_entry_blob TEXT NOT NULL,
        last_op_id           TEXT NOT NULL,
        folder_id            TEXT,
        title_index          TEXT NOT NULL,
        url_index            TEXT,
        updated_at           INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_folder ON vault_entries(folder_id);
    CREATE INDEX IF NOT EXISTS idx_entries_title ON vault_entries(title_index);
    CREATE INDEX IF NOT EXISTS idx_entries_url ON vault_entries(url_index);
    CREATE INDEX IF NOT EXISTS idx_entries_updated ON vault_entries(updated_at);

    CREATE TABLE IF NOT EXISTS vault_ops (
        op_id             TEXT PRIMARY KEY,
        entry_id          TEXT NOT NULL,
        op_type           TEXT NOT NULL,
        epoch             INTEGER NOT NULL,
        encrypted_op_blob TEXT NOT NULL,
        ts                INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_ops_entry ON vault_ops(entry_id);
    CREATE INDEX IF NOT EXISTS idx_ops_ts ON vault_ops(ts);

    CREATE TABLE IF NOT EXISTS vault_snapshots (
        snapshot_id             TEXT PRIMARY KEY,
        epoch                   INTEGER NOT NULL,
        mxc_url                 TEXT NOT NULL,
        hash                    TEXT NOT NULL,
        size                    INTEGER NOT NULL,
        encrypted_snapshot_meta TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_snapshots_epoch ON vault_snapshots(epoch);

    CREATE TABLE IF NOT EXISTS vault_state (
        id                   TEXT PRIMARY KEY,
        latest_applied_op_id TEXT,
        latest_snapshot_id   TEXT,
        epoch                INTEGER NOT NULL,
        schema_version       INTEGER NOT NULL
    );
"#;

/// Open (creating if needed) the store at `path`
pub fn open_store(path: impl AsRef<Path>) -> Result<Connection> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path.as_ref())?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Throwaway store for tests and for sessions without persistence
pub fn open_memory_store() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}
