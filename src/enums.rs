// src/enums.rs
//! Public enum types used throughout the crate
//!
//! Central location for the closed sets that appear on the wire:
//! entry types, custom field kinds and operation kinds.

use serde::{Deserialize, Serialize};

/// Kind of vault item. Immutable once an entry is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[default]
    Login,
    SecureNote,
    CreditCard,
    Identity,
    ApiCredential,
    Custom,
}

impl EntryType {
    /// Only these types take part in URL-based autofill suggestions
    pub fn is_autofill_eligible(self) -> bool {
        matches!(self, EntryType::Login | EntryType::ApiCredential)
    }
}

/// Sensitivity of a custom field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldKind {
    #[default]
    Text,
    Password,
    Hidden,
}

/// Intent carried by an op event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Create => "create",
            OpKind::Update => "update",
            OpKind::Delete => "delete",
        }
    }

    /// Parse the wire name; unknown kinds are `None`
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "create" => Some(OpKind::Create),
            "update" => Some(OpKind::Update),
            "delete" => Some(OpKind::Delete),
            _ => None,
        }
    }
}
