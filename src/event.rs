// src/event.rs
//! Room events and vault metadata as seen from the transport
//!
//! Transport payloads are untyped JSON. `classify` is the one place that
//! looks at them: it validates the shape and returns a tagged result before
//! anything else touches a field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::consts::{EVENT_TYPE_VAULT_OP, EVENT_TYPE_VAULT_SNAPSHOT, INITIAL_EPOCH, SCHEMA_VERSION};
use crate::oplog::VaultOperation;
use crate::snapshot::SnapshotEventContent;

/// One event from the vault room timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Server-assigned id
    #[serde(default)]
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub content: Value,
}

impl RoomEvent {
    pub fn new(event_id: impl Into<String>, event_type: impl Into<String>, content: Value) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            content,
        }
    }
}

/// Per-account vault metadata kept by the transport (account data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMeta {
    pub version: u32,
    pub vault_room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_snapshot_event_id: Option<String>,
    #[serde(default = "initial_epoch")]
    pub vault_epoch: u64,
}

fn initial_epoch() -> u64 {
    INITIAL_EPOCH
}

impl VaultMeta {
    pub fn initial(room_id: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            vault_room_id: room_id.into(),
            latest_snapshot_event_id: None,
            vault_epoch: INITIAL_EPOCH,
        }
    }
}

/// Validated view of a room event
#[derive(Debug, Clone, PartialEq)]
pub enum VaultEvent {
    Operation(VaultOperation),
    Snapshot(SnapshotEventContent),
    /// Other event types, and vault events that fail validation
    Unrecognized,
}

pub fn classify(event: &RoomEvent) -> VaultEvent {
    match event.event_type.as_str() {
        EVENT_TYPE_VAULT_OP => match VaultOperation::from_content(&event.content) {
            Ok(op) => VaultEvent::Operation(op),
            Err(field) => {
                debug!(event_id = %event.event_id, field, "malformed op event");
                VaultEvent::Unrecognized
            }
        },
        EVENT_TYPE_VAULT_SNAPSHOT => match SnapshotEventContent::from_content(&event.content) {
            Some(snapshot) => VaultEvent::Snapshot(snapshot),
            None => {
                debug!(event_id = %event.event_id, "malformed snapshot event");
                VaultEvent::Unrecognized
            }
        },
        _ => VaultEvent::Unrecognized,
    }
}
