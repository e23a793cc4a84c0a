// src/transport/memory.rs
//! In-process transport: one vault room held in memory
//!
//! Used by the tests and by the `replay_timeline` binary. Clones share the
//! same room, so two sessions built on clones behave like two devices.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use super::VaultTransport;
use crate::aliases::EscrowedKey;
use crate::consts::{VAULT_MASTER_KEY_SECRET_NAME, VAULT_META_ACCOUNT_DATA_KEY};
use crate::error::{CoreError, Result};
use crate::event::{RoomEvent, VaultMeta};

#[derive(Debug, Default)]
struct MemoryRoom {
    /// Escrowed secrets by secret name
    secrets: HashMap<String, Vec<u8>>,
    /// Account data by event type, stored as raw JSON
    account_data: HashMap<String, Value>,
    /// `None` until the room has "synced"
    timeline: Option<Vec<RoomEvent>>,
    next_event: u64,
    sync_delay: Option<Duration>,
    reject_publish: bool,
}

impl MemoryRoom {
    fn meta(&self) -> Option<VaultMeta> {
        let value = self.account_data.get(VAULT_META_ACCOUNT_DATA_KEY)?;
        match VaultMeta::deserialize(value) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(error = %e, "vault metadata is malformed");
                None
            }
        }
    }

    fn put_meta(&mut self, meta: &VaultMeta) -> Result<()> {
        self.account_data
            .insert(VAULT_META_ACCOUNT_DATA_KEY.to_owned(), serde_json::to_value(meta)?);
        Ok(())
    }

    fn put_key(&mut self, key: &[u8]) {
        self.secrets
            .insert(VAULT_MASTER_KEY_SECRET_NAME.to_owned(), key.to_vec());
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    room: Arc<RwLock<MemoryRoom>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_vault_key(&self, key: &[u8]) {
        self.room.write().await.put_key(key);
    }

    pub async fn set_vault_meta(&self, meta: VaultMeta) {
        if let Err(e) = self.room.write().await.put_meta(&meta) {
            warn!(error = %e, "could not store vault metadata");
        }
    }

    /// Raw account data write, for content that need not be valid metadata
    pub async fn set_account_data(&self, event_type: &str, content: Value) {
        self.room
            .write()
            .await
            .account_data
            .insert(event_type.to_owned(), content);
    }

    /// Mark the room as synced with the given history
    pub async fn set_timeline(&self, events: Vec<RoomEvent>) {
        let mut room = self.room.write().await;
        room.next_event = room.next_event.max(events.len() as u64);
        room.timeline = Some(events);
    }

    /// Make `room_timeline` sleep before answering
    pub async fn set_sync_delay(&self, delay: Duration) {
        self.room.write().await.sync_delay = Some(delay);
    }

    /// Make every `publish` fail
    pub async fn set_reject_publish(&self, reject: bool) {
        self.room.write().await.reject_publish = reject;
    }

    /// Copy of the current timeline (empty if not synced)
    pub async fn events(&self) -> Vec<RoomEvent> {
        self.room.read().await.timeline.clone().unwrap_or_default()
    }

    pub async fn current_meta(&self) -> Option<VaultMeta> {
        self.room.read().await.meta()
    }

    pub async fn current_key(&self) -> Option<Vec<u8>> {
        self.room
            .read()
            .await
            .secrets
            .get(VAULT_MASTER_KEY_SECRET_NAME)
            .cloned()
    }
}

#[async_trait]
impl VaultTransport for MemoryTransport {
    async fn load_vault_key(&self) -> Option<EscrowedKey> {
        self.current_key().await.map(EscrowedKey::new)
    }

    async fn vault_meta(&self) -> Option<VaultMeta> {
        self.current_meta().await
    }

    async fn room_timeline(&self, room_id: &str) -> Option<Vec<RoomEvent>> {
        let delay = self.room.read().await.sync_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let room = self.room.read().await;
        match room.meta() {
            Some(meta) if meta.vault_room_id == room_id => room.timeline.clone(),
            _ => None,
        }
    }

    async fn publish(&self, room_id: &str, event_type: &str, content: Value) -> Result<String> {
        let mut room = self.room.write().await;
        if room.reject_publish {
            return Err(CoreError::Transport(format!("publish to {room_id} rejected")));
        }
        room.next_event += 1;
        let event_id = format!("${}", room.next_event);
        room.timeline
            .get_or_insert_with(Vec::new)
            .push(RoomEvent::new(event_id.clone(), event_type, content));
        Ok(event_id)
    }

    async fn store_vault_meta(&self, meta: &VaultMeta) -> Result<()> {
        self.room.write().await.put_meta(meta)
    }

    async fn store_vault_key(&self, key: &[u8]) -> Result<()> {
        self.room.write().await.put_key(key);
        Ok(())
    }
}
