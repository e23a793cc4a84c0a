// src/transport/mod.rs
//! Boundary to the messaging / account layer that carries the vault
//!
//! The transport owns room membership, durable ordering and key escrow.
//! This crate only asks it for the key, the metadata and the ordered
//! timeline, and hands it events to publish.

use async_trait::async_trait;
use serde_json::Value;

use crate::aliases::EscrowedKey;
use crate::error::Result;
use crate::event::{RoomEvent, VaultMeta};

mod memory;

pub use memory::MemoryTransport;

#[async_trait]
pub trait VaultTransport: Send + Sync {
    /// Resolve the vault key from escrow. `None` when it cannot be unlocked.
    async fn load_vault_key(&self) -> Option<EscrowedKey>;

    /// Account-level vault metadata, if a vault exists
    async fn vault_meta(&self) -> Option<VaultMeta>;

    /// Ordered, replayable timeline of the vault room.
    ///
    /// May wait on an external sync signal; callers bound the wait.
    /// `None` when the room is not known locally yet.
    async fn room_timeline(&self, room_id: &str) -> Option<Vec<RoomEvent>>;

    /// Publish one event; returns the server-assigned id once durable
    async fn publish(&self, room_id: &str, event_type: &str, content: Value) -> Result<String>;

    async fn store_vault_meta(&self, meta: &VaultMeta) -> Result<()>;

    /// Replace the escrowed vault key (rotation)
    async fn store_vault_key(&self, key: &[u8]) -> Result<()>;
}
