// src/core/key.rs
//! Vault key generation and representation utilities

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use super::Result;
use crate::aliases::{SecureConversionsExt, SecureRandomExt, VaultKey32};
use crate::consts::VAULT_KEY_LEN;
use crate::error::CoreError;

/// Generate a new random 256-bit vault key
#[inline]
pub fn generate_vault_key() -> VaultKey32 {
    VaultKey32::random()
}

/// Adopt key material from the escrow layer. Anything but 32 bytes is a hard error.
pub fn vault_key_from_slice(bytes: &[u8]) -> Result<VaultKey32> {
    let arr: [u8; VAULT_KEY_LEN] = bytes.try_into().map_err(|_| CoreError::InvalidKeyLength {
        expected: VAULT_KEY_LEN,
        actual: bytes.len(),
    })?;
    Ok(VaultKey32::new(arr))
}

/// Parse a hex-encoded key (recovery sheets, CLI input)
pub fn vault_key_from_hex(hex_key: &str) -> Result<VaultKey32> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| CoreError::Crypto(format!("vault key is not valid hex: {e}")))?;
    vault_key_from_slice(&bytes)
}

/// Multiple string representations of a key for escrow / display
#[derive(Debug, Clone)]
pub struct KeyRepr {
    pub hex: String,
    pub base64: String,
    pub base64url_no_pad: String,
}

pub fn key_representations(key: &VaultKey32) -> KeyRepr {
    KeyRepr {
        hex: key.expose_secret().to_hex(),
        base64: STANDARD.encode(key.expose_secret()),
        base64url_no_pad: URL_SAFE_NO_PAD.encode(key.expose_secret()),
    }
}
