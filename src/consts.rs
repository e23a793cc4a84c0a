// src/consts.rs
//! Shared constants: namespaces, event types, envelope sizes

// Everything below the `com.vaultrix.vault.v1` namespace
pub const VAULT_META_ACCOUNT_DATA_KEY: &str = "com.vaultrix.vault.v1.meta";
pub const VAULT_MASTER_KEY_SECRET_NAME: &str = "com.vaultrix.vault.v1.master_key";

pub const EVENT_TYPE_VAULT_OP: &str = "com.vaultrix.vault.v1.op";
pub const EVENT_TYPE_VAULT_SNAPSHOT: &str = "com.vaultrix.vault.v1.snapshot";

/// Payload schema version. Bump together with any wire-format change.
pub const SCHEMA_VERSION: u32 = 1;

/// Epoch a brand-new vault starts at
pub const INITIAL_EPOCH: u64 = 1;

/// AES-256-GCM parameters
pub const VAULT_KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Separator between the three base64 segments of a serialized bundle
pub const BUNDLE_SEPARATOR: char = '.';

/// Prefix of the synthetic op ids recorded for snapshot-restored entries.
// '!' sorts below every character of a UUID op id.
pub const SNAPSHOT_MARKER_PREFIX: &str = "!snapshot:";

/// Default ceiling on waiting for the room timeline at unlock
pub const DEFAULT_UNLOCK_TIMEOUT_MS: u64 = 10_000;

/// Default number of applied ops after which a compaction is suggested
pub const DEFAULT_SNAPSHOT_EVERY_OPS: u64 = 500;

/// Singleton key of the local sync-state row
pub const VAULT_STATE_ROW_ID: &str = "singleton";

pub const NO_KEY_REASON: &str = "Could not load vault key from secret storage";
pub const NO_META_REASON: &str = "No vault metadata found";
pub const ROOM_NOT_SYNCED: &str = "Vault room not yet synced";
