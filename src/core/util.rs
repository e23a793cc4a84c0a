// src/core/util.rs
//! Small helpers used across the crate: clocks, ids, hashing

use blake3::Hasher;
use chrono::Utc;
use uuid::Uuid;

/// Logical write time: wall-clock milliseconds since the Unix epoch.
///
/// No skew correction is applied; devices with skewed clocks can lose
/// logically later edits under LWW.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Fresh globally unique op id (lowercase hyphenated UUID v4)
pub fn new_op_id() -> String {
    Uuid::new_v4().to_string()
}

/// Compute BLAKE3 hash and return as lowercase hex string
pub fn blake3_hex(data: &[u8]) -> String {
    Hasher::new().update(data).finalize().to_hex().to_string()
}

/// Keyed BLAKE3 of a lowercased index term, so local lookup columns never
/// hold plaintext titles or hostnames
pub fn keyed_index(key: &[u8; 32], term: &str) -> String {
    blake3::keyed_hash(key, term.to_lowercase().as_bytes())
        .to_hex()
        .to_string()
}
