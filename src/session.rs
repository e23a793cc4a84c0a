// src/session.rs
//! Unlock orchestration and the live vault session
//!
//! A [`VaultSession`] is created by [`VaultSession::unlock`] and destroyed by
//! [`VaultSession::lock`]. It owns the vault key, the model and (optionally)
//! a handle on the local row store. Everything that touches the model goes
//! through the session's mutex, so ops are applied one at a time.

use std::fmt;
use std::sync::{Mutex as StdMutex, PoisonError};

use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::aliases::VaultKey32;
use crate::config::Config;
use crate::consts::{
    EVENT_TYPE_VAULT_OP, EVENT_TYPE_VAULT_SNAPSHOT, NO_KEY_REASON, NO_META_REASON, ROOM_NOT_SYNCED,
    SCHEMA_VERSION,
};
use crate::core::{new_op_id, now_millis, vault_key_from_slice};
use crate::db::{
    clear_entry_rows, delete_entry_row, entry_row_for, init_vault_state, op_row_for, open_store,
    put_entry_row, put_op_row, put_snapshot_row, set_vault_state, snapshot_row_for, VaultStateRow,
};
use crate::enums::OpKind;
use crate::error::{CoreError, Result};
use crate::event::{classify, RoomEvent, VaultEvent, VaultMeta};
use crate::model::VaultModel;
use crate::oplog::{apply_operation, build_operation_at, OpOutcome, VaultOperation};
use crate::rotation::rotate_vault_key;
use crate::schema::VaultEntry;
use crate::snapshot::{
    apply_snapshot_to_model, build_snapshot_event, parse_snapshot, parse_snapshot_content,
    SnapshotEventContent,
};
use crate::transport::VaultTransport;

/// Result of [`VaultSession::unlock`]
#[derive(Debug)]
pub enum UnlockOutcome {
    Failed {
        reason: String,
    },
    Unlocked {
        session: VaultSession,
        /// Set when the room timeline was not available in time
        warning: Option<String>,
    },
}

impl UnlockOutcome {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, UnlockOutcome::Unlocked { .. })
    }

    pub fn into_session(self) -> Option<VaultSession> {
        match self {
            UnlockOutcome::Unlocked { session, .. } => Some(session),
            UnlockOutcome::Failed { .. } => None,
        }
    }
}

/// What a full timeline replay did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Id of the snapshot used as the baseline, if any
    pub snapshot_id: Option<String>,
    pub ops_applied: usize,
    pub ops_dropped: usize,
    /// Last op that actually changed the model
    pub last_op_id: Option<String>,
}

/// What [`VaultSession::ingest`] did with one live event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Op(OpOutcome),
    SnapshotApplied,
    /// Snapshot from the current or an older epoch, or one that does not open
    SnapshotIgnored,
    Unrecognized,
}

/// Rebuild a model from an ordered timeline.
///
/// Two passes: the latest snapshot that opens under `key` seeds the model at
/// `epoch`, then every op event is fed through the op codec in timeline
/// order. `model` should be fresh and already at `epoch`.
pub fn replay_timeline(
    model: &mut VaultModel,
    events: &[RoomEvent],
    key: &VaultKey32,
    epoch: u64,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();

    let baseline = events
        .iter()
        .filter(|event| event.event_type == EVENT_TYPE_VAULT_SNAPSHOT)
        .filter_map(|event| parse_snapshot_content(&event.content, key))
        .last();

    if let Some((snapshot, entries)) = baseline {
        debug!(snapshot_id = %snapshot.snapshot_id, entries = entries.len(), "seeding model from snapshot");
        apply_snapshot_to_model(model, &entries, epoch);
        summary.snapshot_id = Some(snapshot.snapshot_id);
    }

    for event in events {
        let VaultEvent::Operation(op) = classify(event) else {
            continue;
        };
        if apply_operation(&op, key, model).is_applied() {
            summary.ops_applied += 1;
            summary.last_op_id = Some(op.op_id);
        } else {
            summary.ops_dropped += 1;
        }
    }
    summary
}

/// Mutable per-session state, guarded by one lock
struct SessionState {
    model: VaultModel,
    last_op_id: Option<String>,
    latest_snapshot_id: Option<String>,
    ops_since_snapshot: u64,
}

pub struct VaultSession {
    key: VaultKey32,
    meta: VaultMeta,
    device_id: String,
    snapshot_every_ops: u64,
    state: Mutex<SessionState>,
    store: Option<StdMutex<Connection>>,
}

impl fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSession")
            .field("room_id", &self.meta.vault_room_id)
            .field("epoch", &self.meta.vault_epoch)
            .field("device_id", &self.device_id)
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl VaultSession {
    /// Resolve the key and metadata, replay the room, and hand back a session.
    ///
    /// Missing key or metadata is a `Failed` outcome. A room that is not
    /// synced within `sync.unlock_timeout_ms` still unlocks, with an empty
    /// model and a warning.
    pub async fn unlock<T>(transport: &T, config: &Config) -> UnlockOutcome
    where
        T: VaultTransport + ?Sized,
    {
        let Some(escrowed) = transport.load_vault_key().await else {
            warn!("vault key unavailable");
            return UnlockOutcome::Failed {
                reason: NO_KEY_REASON.to_string(),
            };
        };
        let key = match vault_key_from_slice(escrowed.expose_secret()) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "escrowed vault key rejected");
                return UnlockOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };
        drop(escrowed);

        let Some(meta) = transport.vault_meta().await else {
            warn!("vault metadata missing");
            return UnlockOutcome::Failed {
                reason: NO_META_REASON.to_string(),
            };
        };

        let mut model = VaultModel::new(meta.vault_epoch);
        let timeline = tokio::time::timeout(
            config.unlock_timeout(),
            transport.room_timeline(&meta.vault_room_id),
        )
        .await;

        let (summary, warning) = match timeline {
            Ok(Some(events)) => {
                let summary = replay_timeline(&mut model, &events, &key, meta.vault_epoch);
                (summary, None)
            }
            Ok(None) => {
                warn!(room_id = %meta.vault_room_id, "vault room not known locally");
                (ReplaySummary::default(), Some(ROOM_NOT_SYNCED.to_string()))
            }
            Err(_) => {
                warn!(room_id = %meta.vault_room_id, timeout_ms = config.sync.unlock_timeout_ms, "timed out waiting for vault room");
                (ReplaySummary::default(), Some(ROOM_NOT_SYNCED.to_string()))
            }
        };

        info!(
            room_id = %meta.vault_room_id,
            epoch = meta.vault_epoch,
            entries = model.len(),
            ops_applied = summary.ops_applied,
            ops_dropped = summary.ops_dropped,
            snapshot = summary.snapshot_id.is_some(),
            "vault unlocked"
        );

        let store = if config.features.persist_locally {
            let path = config.store_db_path();
            match open_store(&path) {
                Ok(conn) => Some(conn),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "local store unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        let mut session = VaultSession {
            key,
            device_id: config.sync.device_id.clone().unwrap_or_else(new_op_id),
            snapshot_every_ops: config.sync.snapshot_every_ops,
            state: Mutex::new(SessionState {
                model,
                ops_since_snapshot: summary.ops_applied as u64,
                last_op_id: summary.last_op_id,
                latest_snapshot_id: summary.snapshot_id,
            }),
            meta,
            store: None,
        };

        if let Some(conn) = store {
            if let Err(e) = session.attach_store(conn) {
                warn!(error = %e, "could not seed local store");
            }
        }

        UnlockOutcome::Unlocked { session, warning }
    }

    /// Attach a local row store and rewrite it from the current model
    pub fn attach_store(&mut self, conn: Connection) -> Result<()> {
        let state = self.state.get_mut();
        init_vault_state(&conn, state.model.epoch())?;
        rewrite_store(&conn, &self.key, state)?;
        self.store = Some(StdMutex::new(conn));
        Ok(())
    }

    /// End the session. The key is zeroised when it drops.
    pub fn lock(self) {
        info!(room_id = %self.meta.vault_room_id, "vault locked");
    }

    pub fn room_id(&self) -> &str {
        &self.meta.vault_room_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn meta(&self) -> &VaultMeta {
        &self.meta
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    // ──────────────────────────────────────────────────────────────
    // Reads
    // ──────────────────────────────────────────────────────────────

    pub async fn list_entries(&self) -> Vec<VaultEntry> {
        self.state.lock().await.model.list_entries()
    }

    pub async fn get_entry(&self, entry_id: &str) -> Option<VaultEntry> {
        self.state.lock().await.model.get_entry(entry_id)
    }

    pub async fn entries_for_url(&self, url: &str) -> Vec<VaultEntry> {
        self.state.lock().await.model.entries_for_url(url)
    }

    pub async fn epoch(&self) -> u64 {
        self.state.lock().await.model.epoch()
    }

    /// Copy of the current model
    pub async fn model(&self) -> VaultModel {
        self.state.lock().await.model.clone()
    }

    /// True once enough ops have been applied since the last snapshot
    pub async fn should_compact(&self) -> bool {
        self.state.lock().await.ops_since_snapshot >= self.snapshot_every_ops
    }

    // ──────────────────────────────────────────────────────────────
    // Writes
    // ──────────────────────────────────────────────────────────────

    /// Publish and apply a create. An empty id gets a fresh one.
    pub async fn create_entry<T>(&self, transport: &T, mut entry: VaultEntry) -> Result<VaultEntry>
    where
        T: VaultTransport + ?Sized,
    {
        if entry.id.is_empty() {
            entry.id = new_op_id();
        }
        let mut state = self.state.lock().await;
        if state.model.contains(&entry.id) {
            return Err(CoreError::InvalidEntry(format!("entry {} already exists", entry.id)));
        }
        let ts = next_ts(&state.model, &entry.id);
        if entry.created_at == 0 {
            entry.created_at = ts;
        }
        entry.updated_at = ts;
        let entry_id = entry.id.clone();
        self.write(&mut state, transport, OpKind::Create, &entry_id, Some(&entry), ts)
            .await?;
        Ok(entry)
    }

    /// Publish and apply a full-record replace. The entry type cannot change.
    pub async fn update_entry<T>(&self, transport: &T, mut entry: VaultEntry) -> Result<VaultEntry>
    where
        T: VaultTransport + ?Sized,
    {
        let mut state = self.state.lock().await;
        let Some(current) = state.model.get_entry(&entry.id) else {
            return Err(CoreError::InvalidEntry(format!("no entry {}", entry.id)));
        };
        if current.entry_type != entry.entry_type {
            return Err(CoreError::InvalidEntry(format!(
                "entry {} cannot change type",
                entry.id
            )));
        }
        let ts = next_ts(&state.model, &entry.id);
        entry.created_at = current.created_at;
        entry.updated_at = ts;
        let entry_id = entry.id.clone();
        self.write(&mut state, transport, OpKind::Update, &entry_id, Some(&entry), ts)
            .await?;
        Ok(entry)
    }

    pub async fn delete_entry<T>(&self, transport: &T, entry_id: &str) -> Result<()>
    where
        T: VaultTransport + ?Sized,
    {
        let mut state = self.state.lock().await;
        if !state.model.contains(entry_id) {
            return Err(CoreError::InvalidEntry(format!("no entry {entry_id}")));
        }
        let ts = next_ts(&state.model, entry_id);
        self.write(&mut state, transport, OpKind::Delete, entry_id, None, ts)
            .await?;
        Ok(())
    }

    /// Build, publish, then apply locally. Nothing is applied if publish fails;
    /// a local store failure after that is logged, not returned.
    async fn write<T>(
        &self,
        state: &mut SessionState,
        transport: &T,
        kind: OpKind,
        entry_id: &str,
        entry: Option<&VaultEntry>,
        ts: i64,
    ) -> Result<VaultOperation>
    where
        T: VaultTransport + ?Sized,
    {
        let prev = state.model.winning_op_id(entry_id).map(str::to_owned);
        let op = build_operation_at(
            kind,
            entry_id,
            entry,
            prev.as_deref(),
            state.model.epoch(),
            &self.device_id,
            &self.key,
            ts,
        )?;
        let event_id = transport
            .publish(&self.meta.vault_room_id, EVENT_TYPE_VAULT_OP, op.to_content()?)
            .await?;
        debug!(event_id = %event_id, op_id = %op.op_id, op = kind.as_str(), "op published");

        let outcome = state
            .model
            .apply_op(entry_id, kind, entry, &op.op_id, op.ts, op.epoch);
        if outcome.is_applied() {
            state.last_op_id = Some(op.op_id.clone());
            state.ops_since_snapshot += 1;
            // already in the room and the model; the store catches up on the next rewrite
            if let Err(e) = self.persist_op(state, &op, entry) {
                warn!(op_id = %op.op_id, error = %e, "failed to persist own op");
            }
        } else {
            warn!(op_id = %op.op_id, ?outcome, "own op not applied locally");
        }
        Ok(op)
    }

    /// Apply one live event from the room
    pub async fn ingest(&self, event: &RoomEvent) -> IngestOutcome {
        let mut state = self.state.lock().await;
        match classify(event) {
            VaultEvent::Operation(op) => {
                let outcome = apply_operation(&op, &self.key, &mut state.model);
                if outcome.is_applied() {
                    state.last_op_id = Some(op.op_id.clone());
                    state.ops_since_snapshot += 1;
                    let entry = state.model.get_entry(&op.entry_id);
                    if let Err(e) = self.persist_op(&state, &op, entry.as_ref()) {
                        warn!(op_id = %op.op_id, error = %e, "failed to persist op");
                    }
                }
                IngestOutcome::Op(outcome)
            }
            VaultEvent::Snapshot(snapshot) => {
                if snapshot.epoch <= state.model.epoch() {
                    debug!(snapshot_id = %snapshot.snapshot_id, "snapshot not newer than current epoch");
                    return IngestOutcome::SnapshotIgnored;
                }
                let Some(entries) = parse_snapshot(&snapshot.ciphertext, &self.key) else {
                    return IngestOutcome::SnapshotIgnored;
                };
                apply_snapshot_to_model(&mut state.model, &entries, snapshot.epoch);
                state.latest_snapshot_id = Some(snapshot.snapshot_id.clone());
                state.ops_since_snapshot = 0;
                if let Some(store) = &self.store {
                    let conn = store.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Err(e) = put_snapshot_row(&conn, &snapshot_row_for(&snapshot))
                        .and_then(|_| rewrite_store(&conn, &self.key, &state))
                    {
                        warn!(error = %e, "failed to persist snapshot");
                    }
                }
                IngestOutcome::SnapshotApplied
            }
            VaultEvent::Unrecognized => IngestOutcome::Unrecognized,
        }
    }

    /// Publish a snapshot of the current state under the current key
    pub async fn compact<T>(&mut self, transport: &T) -> Result<SnapshotEventContent>
    where
        T: VaultTransport + ?Sized,
    {
        let state = self.state.get_mut();
        let snapshot = build_snapshot_event(
            &state.model.list_entries(),
            state.model.epoch(),
            state.last_op_id.as_deref(),
            &self.key,
        )?;
        let event_id = transport
            .publish(&self.meta.vault_room_id, EVENT_TYPE_VAULT_SNAPSHOT, snapshot.to_content()?)
            .await?;

        let meta = VaultMeta {
            latest_snapshot_event_id: Some(event_id),
            ..self.meta.clone()
        };
        transport.store_vault_meta(&meta).await?;
        self.meta = meta;

        state.latest_snapshot_id = Some(snapshot.snapshot_id.clone());
        state.ops_since_snapshot = 0;
        if let Some(store) = &self.store {
            let conn = store.lock().unwrap_or_else(PoisonError::into_inner);
            put_snapshot_row(&conn, &snapshot_row_for(&snapshot))?;
            set_vault_state(&conn, &state_row(state))?;
        }
        info!(snapshot_id = %snapshot.snapshot_id, entries = state.model.len(), "vault compacted");
        Ok(snapshot)
    }

    /// Replace the vault key and move to the next epoch.
    ///
    /// Publishes a snapshot sealed under the new key, hands the key to escrow
    /// and bumps the epoch in metadata, in that order. Local state switches
    /// over only after all three succeed. Returns the new epoch.
    pub async fn rotate<T>(&mut self, transport: &T) -> Result<u64>
    where
        T: VaultTransport + ?Sized,
    {
        let state = self.state.get_mut();
        let outcome = rotate_vault_key(&state.model, state.last_op_id.as_deref())?;

        let event_id = transport
            .publish(
                &self.meta.vault_room_id,
                EVENT_TYPE_VAULT_SNAPSHOT,
                outcome.snapshot.to_content()?,
            )
            .await?;
        transport
            .store_vault_key(outcome.new_key.expose_secret())
            .await?;
        let meta = VaultMeta {
            vault_epoch: outcome.new_epoch,
            latest_snapshot_event_id: Some(event_id),
            ..self.meta.clone()
        };
        transport.store_vault_meta(&meta).await?;

        apply_snapshot_to_model(&mut state.model, &outcome.entries, outcome.new_epoch);
        state.latest_snapshot_id = Some(outcome.snapshot.snapshot_id.clone());
        state.ops_since_snapshot = 0;
        self.key = outcome.new_key;
        self.meta = meta;

        if let Some(store) = &self.store {
            let conn = store.lock().unwrap_or_else(PoisonError::into_inner);
            put_snapshot_row(&conn, &snapshot_row_for(&outcome.snapshot))?;
            rewrite_store(&conn, &self.key, state)?;
        }
        info!(epoch = outcome.new_epoch, entries = state.model.len(), "vault key rotated");
        Ok(outcome.new_epoch)
    }

    fn persist_op(
        &self,
        state: &SessionState,
        op: &VaultOperation,
        entry: Option<&VaultEntry>,
    ) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let conn = store.lock().unwrap_or_else(PoisonError::into_inner);
        put_op_row(&conn, &op_row_for(op))?;
        match (op.op, entry) {
            (OpKind::Delete, _) | (_, None) => delete_entry_row(&conn, &op.entry_id)?,
            (_, Some(entry)) => put_entry_row(&conn, &entry_row_for(entry, &op.op_id, &self.key)?)?,
        }
        set_vault_state(&conn, &state_row(state))
    }
}

/// Op timestamp for a local write: wall clock, bumped past the entry's
/// current winner so a write in the same millisecond still wins
fn next_ts(model: &VaultModel, entry_id: &str) -> i64 {
    let now = now_millis();
    match model.winner(entry_id) {
        Some(winner) if winner.ts >= now => winner.ts.saturating_add(1),
        _ => now,
    }
}

fn state_row(state: &SessionState) -> VaultStateRow {
    VaultStateRow {
        latest_applied_op_id: state.last_op_id.clone(),
        latest_snapshot_id: state.latest_snapshot_id.clone(),
        epoch: state.model.epoch(),
        schema_version: SCHEMA_VERSION,
    }
}

/// Replace every entry row with the model's entries sealed under `key`
fn rewrite_store(conn: &Connection, key: &VaultKey32, state: &SessionState) -> Result<()> {
    clear_entry_rows(conn)?;
    for entry in state.model.list_entries() {
        let last_op_id = state.model.winning_op_id(&entry.id).unwrap_or_default();
        put_entry_row(conn, &entry_row_for(&entry, last_op_id, key)?)?;
    }
    set_vault_state(conn, &state_row(state))
}
