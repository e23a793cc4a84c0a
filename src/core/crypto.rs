// src/core/crypto.rs
//! Application-level encryption envelope: AES-256-GCM under the vault key
//!
//! Every op payload and snapshot payload goes through `seal` / `open`.
//! Nothing here does I/O. A fresh 96-bit nonce is drawn per call, so sealing
//! the same plaintext twice never yields the same bundle.
//!
//! Wire form of a bundle is `base64(iv).base64(ct).base64(tag)`. Changing it
//! requires a `SCHEMA_VERSION` bump.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;

use super::Result;
use crate::consts::{BUNDLE_SEPARATOR, IV_LEN, TAG_LEN, VAULT_KEY_LEN};
use crate::error::CoreError;

/// IV, ciphertext and authentication tag, kept apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextBundle {
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

impl CiphertextBundle {
    /// Serialize to the three-segment wire form
    pub fn to_wire(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            STANDARD.encode(&self.iv),
            STANDARD.encode(&self.ciphertext),
            STANDARD.encode(&self.tag),
            sep = BUNDLE_SEPARATOR
        )
    }

    /// Parse the wire form. Any structural problem is an authentication failure.
    pub fn from_wire(serialized: &str) -> Result<Self> {
        let parts: Vec<&str> = serialized.split(BUNDLE_SEPARATOR).collect();
        let [iv, ct, tag] = parts[..] else {
            return Err(CoreError::AuthenticationFailure);
        };
        let decode = |s: &str| {
            STANDARD
                .decode(s)
                .map_err(|_| CoreError::AuthenticationFailure)
        };
        Ok(Self {
            iv: decode(iv)?,
            ciphertext: decode(ct)?,
            tag: decode(tag)?,
        })
    }
}

impl fmt::Display for CiphertextBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for CiphertextBundle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_wire(s)
    }
}

/// Build the cipher, rejecting anything that is not a 32-byte key
fn cipher_for(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != VAULT_KEY_LEN {
        return Err(CoreError::InvalidKeyLength {
            expected: VAULT_KEY_LEN,
            actual: key.len(),
        });
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CoreError::InvalidKeyLength {
        expected: VAULT_KEY_LEN,
        actual: key.len(),
    })
}

/// Encrypt `plaintext` under `key` with a random IV
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<CiphertextBundle> {
    let cipher = cipher_for(key)?;

    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CoreError::Crypto(format!("Encryption failed: {e}")))?;

    // aes-gcm appends the tag; keep it as its own segment
    let tag = sealed.split_off(sealed.len() - TAG_LEN);
    Ok(CiphertextBundle {
        iv: iv.to_vec(),
        ciphertext: sealed,
        tag,
    })
}

/// Decrypt and verify a bundle
pub fn open(bundle: &CiphertextBundle, key: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;
    if bundle.iv.len() != IV_LEN || bundle.tag.len() != TAG_LEN {
        return Err(CoreError::AuthenticationFailure);
    }

    let mut combined = Vec::with_capacity(bundle.ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(&bundle.ciphertext);
    combined.extend_from_slice(&bundle.tag);

    cipher
        .decrypt(Nonce::from_slice(&bundle.iv), combined.as_slice())
        .map_err(|_| CoreError::AuthenticationFailure)
}

/// `seal` straight to the wire form
pub fn seal_to_wire(plaintext: &[u8], key: &[u8]) -> Result<String> {
    Ok(seal(plaintext, key)?.to_wire())
}

/// Parse the wire form and `open` it
pub fn open_wire(serialized: &str, key: &[u8]) -> Result<Vec<u8>> {
    let bundle = CiphertextBundle::from_wire(serialized)?;
    open(&bundle, key)
}
