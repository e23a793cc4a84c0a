// src/bin/replay_timeline.rs
//! Replay a dumped vault room timeline and list what it converges to
//!
//! Input is a JSON file `{ "meta": VaultMeta, "events": [RoomEvent, ...] }`.
//! The vault key is read as hex from `VAULT_SYNC_KEY_HEX`, or prompted for.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vault_sync_core::core::{blake3_hex, vault_key_from_hex};
use vault_sync_core::{
    load_config, MemoryTransport, RoomEvent, UnlockOutcome, VaultMeta, VaultSession,
};

const KEY_ENV: &str = "VAULT_SYNC_KEY_HEX";

#[derive(Debug, Deserialize)]
struct TimelineDump {
    meta: VaultMeta,
    #[serde(default)]
    events: Vec<RoomEvent>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: replay_timeline <timeline.json>");
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("cannot read {path}"))?;
    let dump: TimelineDump =
        serde_json::from_str(&raw).with_context(|| format!("{path} is not a timeline dump"))?;

    let key_hex = match std::env::var(KEY_ENV) {
        Ok(hex) => hex,
        Err(_) => rpassword::prompt_password("Vault key (hex): ")?,
    };
    let key = vault_key_from_hex(&key_hex).context("invalid vault key")?;
    let fingerprint = blake3_hex(key.expose_secret())[..8].to_string();
    info!(key = %fingerprint, events = dump.events.len(), "replaying timeline");

    let transport = MemoryTransport::new();
    transport.set_vault_key(key.expose_secret()).await;
    transport.set_vault_meta(dump.meta).await;
    transport.set_timeline(dump.events).await;
    drop(key);

    let mut config = load_config().clone();
    config.features.persist_locally = false;

    let session = match VaultSession::unlock(&transport, &config).await {
        UnlockOutcome::Failed { reason } => bail!("unlock failed: {reason}"),
        UnlockOutcome::Unlocked { session, warning } => {
            if let Some(warning) = warning {
                warn!("{warning}");
            }
            session
        }
    };

    let mut entries = session.list_entries().await;
    entries.sort_by(|a, b| a.title.cmp(&b.title));
    println!("epoch {}: {} entr(ies)", session.epoch().await, entries.len());
    for entry in &entries {
        println!("{}  {:<14}  {}", entry.id, format!("{:?}", entry.entry_type), entry.title);
    }

    session.lock();
    Ok(())
}
