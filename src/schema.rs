// src/schema.rs
//! Vault entry shapes
//!
//! Pure data: one flat record per vault item with the type-specific
//! predefined fields all optional, plus an ordered list of custom fields.
//! The only behavior here is structural validation of untrusted JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::{CustomFieldKind, EntryType};

/// User-defined field attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CustomFieldKind>,
}

/// Reference to an image or file stored out of band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAttachment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mxc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// A single credential or record.
///
/// `id` is never reused within a vault and `entry_type` never changes after
/// creation. `created_at` / `updated_at` are logical write times in
/// milliseconds, not a statement about wall-clock truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VaultEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub title: String,

    // login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotp_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotp_counter: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_codes: Option<Vec<String>>,

    // secure note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    // credit card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,

    // identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,

    // api credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<EntryAttachment>>,

    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl VaultEntry {
    /// Fresh entry with both timestamps set to `now`
    pub fn new(
        id: impl Into<String>,
        entry_type: EntryType,
        title: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: id.into(),
            entry_type,
            title: title.into(),
            created_at: now,
            updated_at: now,
            ..Self::default()
        }
    }

    /// Minimal stand-in record sealed as the payload of a delete op
    pub fn placeholder(entry_id: &str, ts: i64) -> Self {
        Self {
            id: entry_id.to_owned(),
            entry_type: EntryType::Login,
            updated_at: ts,
            ..Self::default()
        }
    }
}

/// Does this JSON value look like a `VaultEntry`?
///
/// Checks the required `id` (non-empty string) and a known `type`; every
/// other field is optional and validated on deserialization.
pub fn validate_entry_shape(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let has_id = obj
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    let has_type = obj
        .get("type")
        .is_some_and(|t| serde_json::from_value::<EntryType>(t.clone()).is_ok());
    has_id && has_type
}

/// Shape-check then deserialize one untrusted entry
pub fn decode_entry(value: Value) -> Option<VaultEntry> {
    if !validate_entry_shape(&value) {
        return None;
    }
    serde_json::from_value(value).ok()
}
