// tests/support.rs
//! Fixtures: entries, keys, configs and a seeded in-memory room

use vault_sync_core::config::Config;
use vault_sync_core::consts::{EVENT_TYPE_VAULT_OP, EVENT_TYPE_VAULT_SNAPSHOT};
use vault_sync_core::core::generate_vault_key;
use vault_sync_core::{
    EntryType, MemoryTransport, RoomEvent, SnapshotEventContent, VaultEntry, VaultKey32, VaultMeta,
    VaultOperation,
};

#[allow(dead_code)]
pub const ROOM_ID: &str = "!vault:example.org";

#[allow(dead_code)]
pub fn login(id: &str, title: &str, username: &str, ts: i64) -> VaultEntry {
    VaultEntry {
        username: Some(username.to_owned()),
        url: Some(format!("https://{}.com/login", title.to_lowercase())),
        ..VaultEntry::new(id, EntryType::Login, title, ts)
    }
}

#[allow(dead_code)]
pub fn note(id: &str, title: &str, body: &str, ts: i64) -> VaultEntry {
    VaultEntry {
        body: Some(body.to_owned()),
        ..VaultEntry::new(id, EntryType::SecureNote, title, ts)
    }
}

#[allow(dead_code)]
pub fn key() -> VaultKey32 {
    generate_vault_key()
}

/// Config for tests: no local store, short unlock timeout
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.sync.unlock_timeout_ms = 200;
    config.sync.device_id = Some("test-device".into());
    config.features.persist_locally = false;
    config
}

#[allow(dead_code)]
pub fn op_event(event_id: &str, op: &VaultOperation) -> RoomEvent {
    RoomEvent::new(event_id, EVENT_TYPE_VAULT_OP, op.to_content().expect("op content"))
}

#[allow(dead_code)]
pub fn snapshot_event(event_id: &str, snapshot: &SnapshotEventContent) -> RoomEvent {
    RoomEvent::new(
        event_id,
        EVENT_TYPE_VAULT_SNAPSHOT,
        snapshot.to_content().expect("snapshot content"),
    )
}

/// Room with key, metadata and the given (already synced) history
#[allow(dead_code)]
pub async fn seeded_transport(key: &VaultKey32, events: Vec<RoomEvent>) -> MemoryTransport {
    let transport = MemoryTransport::new();
    transport.set_vault_key(key.expose_secret()).await;
    transport.set_vault_meta(VaultMeta::initial(ROOM_ID)).await;
    transport.set_timeline(events).await;
    transport
}
