// src/lib.rs
//! vault-sync-core: end-to-end encrypted vault sync engine
//!
//! Features:
//! - AES-256-GCM envelope for every op and snapshot payload
//! - Last-writer-wins vault model with epoch gating
//! - Encrypted op log + snapshot compaction over any ordered transport
//! - Key rotation with epoch bump
//! - Full secure-gate v0.5 integration for key material

pub mod aliases;
pub mod config;
pub mod consts;
pub mod core;
pub mod db;
pub mod enums;
pub mod event;
pub mod export;
pub mod model;
pub mod oplog;
pub mod rotation;
pub mod schema;
pub mod session;
pub mod snapshot;
pub mod transport;

pub mod error;

// Re-export everything users need at the crate root
pub use aliases::{EscrowedKey, VaultKey32};
pub use config::{load as load_config, Config};
pub use crate::core::{
    generate_vault_key, open, seal, vault_key_from_hex, vault_key_from_slice, CiphertextBundle,
    Result as CoreResult,
};
pub use enums::{CustomFieldKind, EntryType, OpKind};
pub use error::CoreError;
pub use event::{classify, RoomEvent, VaultEvent, VaultMeta};
pub use export::{export_to_json, export_vault, VaultExport};
pub use model::{ApplyOutcome, VaultModel, Winner};
pub use oplog::{build_operation, parse_and_apply, OpOutcome, VaultOperation};
pub use rotation::{prepare_rotation, rotate_vault_key, RotationOutcome, RotationPlan};
pub use schema::{CustomField, EntryAttachment, VaultEntry};
pub use session::{replay_timeline, IngestOutcome, ReplaySummary, UnlockOutcome, VaultSession};
pub use snapshot::{apply_snapshot_to_model, build_snapshot, parse_snapshot, SnapshotEventContent};
pub use transport::{MemoryTransport, VaultTransport};
