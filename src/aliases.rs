// src/aliases.rs
//! Re-exports secure-gate's ergonomic secret types
//!
//! These are the canonical secret holders used throughout vault-sync-core.

pub use secure_gate::{dynamic_alias, fixed_alias, SecureConversionsExt, SecureRandomExt};

// Fixed-size secrets
fixed_alias!(VaultKey32, 32); // 256-bit AES-GCM vault key, one per epoch

// Dynamic secrets
dynamic_alias!(EscrowedKey, Vec<u8>); // raw key bytes as handed over by the escrow layer, length unchecked
