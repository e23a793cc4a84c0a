// src/model.rs
//! In-memory vault state and last-writer-wins application of ops
//!
//! The model is the only authority on which entries currently exist. It is
//! mutated exclusively through [`VaultModel::apply_op`] and the snapshot
//! replace in `snapshot::apply_snapshot_to_model`. Entries go in and come out
//! as owned copies; callers never hold a reference into the maps.

use std::collections::HashMap;

use tracing::debug;
use url::Url;

use crate::consts::INITIAL_EPOCH;
use crate::enums::OpKind;
use crate::schema::VaultEntry;

/// Op currently winning for one entry id, live or tombstoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub op_id: String,
    pub ts: i64,
}

/// What `apply_op` did with an incoming op
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Encrypted under a retired epoch
    StaleEpoch,
    /// Lost the (ts, op_id) comparison against the recorded winner
    Superseded,
    /// Create/update without an entry, or with a mismatched id
    InvalidEntry,
}

impl ApplyOutcome {
    pub fn is_applied(self) -> bool {
        self == ApplyOutcome::Applied
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultModel {
    entries: HashMap<String, VaultEntry>,
    winners: HashMap<String, Winner>,
    epoch: u64,
}

impl Default for VaultModel {
    fn default() -> Self {
        Self::new(INITIAL_EPOCH)
    }
}

impl VaultModel {
    pub fn new(epoch: u64) -> Self {
        Self {
            entries: HashMap::new(),
            winners: HashMap::new(),
            epoch,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Apply one op under LWW with epoch gating.
    ///
    /// The recorded winner keeps the entry when its timestamp is newer, or
    /// when timestamps tie and its op id sorts at or above the incoming one.
    /// The winner's timestamp is the op `ts` it was applied with (or the
    /// entry's `updated_at` for snapshot-restored entries), so the outcome
    /// depends only on the set of ops seen, never on arrival order.
    /// A winning delete leaves its winner behind as a tombstone, so older
    /// creates/updates for the same id stay rejected.
    pub fn apply_op(
        &mut self,
        entry_id: &str,
        kind: OpKind,
        entry: Option<&VaultEntry>,
        op_id: &str,
        ts: i64,
        op_epoch: u64,
    ) -> ApplyOutcome {
        if op_epoch < self.epoch {
            debug!(entry_id, op_id, op_epoch, epoch = self.epoch, "op from retired epoch ignored");
            return ApplyOutcome::StaleEpoch;
        }

        if let Some(existing) = self.winners.get(entry_id) {
            let existing_ts = existing.ts;
            if existing_ts > ts || (existing_ts == ts && existing.op_id.as_str() >= op_id) {
                debug!(entry_id, op_id, ts, existing_ts, "op superseded");
                return ApplyOutcome::Superseded;
            }
        }

        match kind {
            OpKind::Delete => {
                self.entries.remove(entry_id);
            }
            OpKind::Create | OpKind::Update => {
                let Some(entry) = entry.filter(|e| e.id == entry_id) else {
                    debug!(entry_id, op_id, "create/update without a matching entry");
                    return ApplyOutcome::InvalidEntry;
                };
                self.entries.insert(entry_id.to_owned(), entry.clone());
            }
        }
        self.winners.insert(
            entry_id.to_owned(),
            Winner {
                op_id: op_id.to_owned(),
                ts,
            },
        );
        ApplyOutcome::Applied
    }

    /// All current entries, in no particular order
    pub fn list_entries(&self) -> Vec<VaultEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn get_entry(&self, entry_id: &str) -> Option<VaultEntry> {
        self.entries.get(entry_id).cloned()
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.entries.contains_key(entry_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Op id to use as `prev` for the next local write to this entry
    pub fn winning_op_id(&self, entry_id: &str) -> Option<&str> {
        self.winners.get(entry_id).map(|w| w.op_id.as_str())
    }

    pub fn winner(&self, entry_id: &str) -> Option<&Winner> {
        self.winners.get(entry_id)
    }

    /// Login / API entries whose URL host equals, or is a parent domain of,
    /// the host of `url`. Case-insensitive; unparseable URLs match nothing.
    pub fn entries_for_url(&self, url: &str) -> Vec<VaultEntry> {
        let Some(host) = host_of(url) else {
            return Vec::new();
        };
        self.entries
            .values()
            .filter(|e| e.entry_type.is_autofill_eligible())
            .filter(|e| {
                e.url
                    .as_deref()
                    .and_then(host_of)
                    .is_some_and(|entry_host| {
                        host == entry_host || host.ends_with(&format!(".{entry_host}"))
                    })
            })
            .cloned()
            .collect()
    }

    /// Replace all state. Only the snapshot codec calls this.
    pub(crate) fn replace_all(
        &mut self,
        entries: impl IntoIterator<Item = (VaultEntry, Winner)>,
        epoch: u64,
    ) {
        self.entries.clear();
        self.winners.clear();
        self.epoch = epoch;
        for (entry, winner) in entries {
            self.winners.insert(entry.id.clone(), winner);
            self.entries.insert(entry.id.clone(), entry);
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::EntryType;

    fn login(id: &str, url: &str) -> VaultEntry {
        VaultEntry {
            url: Some(url.to_owned()),
            ..VaultEntry::new(id, EntryType::Login, id, 1)
        }
    }

    #[test]
    fn url_match_includes_subdomains_only() {
        let mut model = VaultModel::default();
        model.apply_op("gh", OpKind::Create, Some(&login("gh", "https://GitHub.com/login")), "a", 1, 1);
        model.apply_op("ev", OpKind::Create, Some(&login("ev", "https://notgithub.com")), "b", 1, 1);

        let hits = model.entries_for_url("https://gist.github.com/x");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "gh");
        assert_eq!(model.entries_for_url("https://github.com").len(), 1);
        assert!(model.entries_for_url("not a url").is_empty());
    }

    #[test]
    fn url_match_skips_ineligible_types() {
        let mut model = VaultModel::default();
        let mut note = login("n", "https://bank.example");
        note.entry_type = EntryType::SecureNote;
        model.apply_op("n", OpKind::Create, Some(&note), "a", 1, 1);
        assert!(model.entries_for_url("https://bank.example").is_empty());
    }

    #[test]
    fn returned_entries_are_copies() {
        let mut model = VaultModel::default();
        model.apply_op("gh", OpKind::Create, Some(&login("gh", "https://github.com")), "a", 1, 1);
        let mut copy = model.get_entry("gh").unwrap();
        copy.title = "changed".into();
        assert_eq!(model.get_entry("gh").unwrap().title, "gh");
    }
}
