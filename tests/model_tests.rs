// tests/model_tests.rs
//! Last-writer-wins and epoch gating on the vault model

mod common;
mod support;

use proptest::prelude::*;
use support::login;
use vault_sync_core::{ApplyOutcome, OpKind, VaultEntry, VaultModel};

fn username(model: &VaultModel, id: &str) -> Option<String> {
    model.get_entry(id).and_then(|e| e.username)
}

#[test]
fn stale_create_does_not_override_newer_update() {
    common::setup();
    let mut model = VaultModel::default();

    let e1 = login("e1", "GitHub", "alice", 100);
    assert!(model.apply_op("e1", OpKind::Create, Some(&e1), "a", 100, 1).is_applied());
    assert!(model.contains("e1"));

    let e1_v2 = login("e1", "GitHub", "alice2", 200);
    assert!(model.apply_op("e1", OpKind::Update, Some(&e1_v2), "b", 200, 1).is_applied());
    assert_eq!(username(&model, "e1").as_deref(), Some("alice2"));

    let stale = login("e1", "GitHub", "bob", 150);
    assert_eq!(
        model.apply_op("e1", OpKind::Create, Some(&stale), "c", 150, 1),
        ApplyOutcome::Superseded
    );
    assert_eq!(username(&model, "e1").as_deref(), Some("alice2"));
}

#[test]
fn delete_leaves_a_tombstone() {
    let mut model = VaultModel::default();
    model.apply_op("e1", OpKind::Create, Some(&login("e1", "GitHub", "alice", 100)), "a", 100, 1);
    model.apply_op("e1", OpKind::Update, Some(&login("e1", "GitHub", "alice2", 200)), "b", 200, 1);

    assert!(model.apply_op("e1", OpKind::Delete, None, "d", 300, 1).is_applied());
    assert!(model.get_entry("e1").is_none());
    assert_eq!(model.winning_op_id("e1"), Some("d"));

    let late = login("e1", "GitHub", "eve", 250);
    assert_eq!(
        model.apply_op("e1", OpKind::Update, Some(&late), "e", 250, 1),
        ApplyOutcome::Superseded
    );
    assert!(model.get_entry("e1").is_none());
}

#[test]
fn timestamp_tie_goes_to_the_larger_op_id() {
    let mut model = VaultModel::default();
    model.apply_op("e1", OpKind::Create, Some(&login("e1", "X", "from-m", 10)), "m", 10, 1);

    let lower = login("e1", "X", "from-a", 10);
    assert_eq!(
        model.apply_op("e1", OpKind::Update, Some(&lower), "a", 10, 1),
        ApplyOutcome::Superseded
    );
    let higher = login("e1", "X", "from-z", 10);
    assert!(model.apply_op("e1", OpKind::Update, Some(&higher), "z", 10, 1).is_applied());
    assert_eq!(username(&model, "e1").as_deref(), Some("from-z"));
}

#[test]
fn replaying_the_same_op_is_a_no_op() {
    let mut model = VaultModel::default();
    let e1 = login("e1", "GitHub", "alice", 100);
    model.apply_op("e1", OpKind::Create, Some(&e1), "a", 100, 1);
    let before = model.clone();
    assert_eq!(
        model.apply_op("e1", OpKind::Create, Some(&e1), "a", 100, 1),
        ApplyOutcome::Superseded
    );
    assert_eq!(model, before);
}

#[test]
fn retired_epoch_never_applies() {
    let mut model = VaultModel::new(3);
    let e1 = login("e1", "GitHub", "alice", i64::MAX);
    assert_eq!(
        model.apply_op("e1", OpKind::Create, Some(&e1), "zzz", i64::MAX, 2),
        ApplyOutcome::StaleEpoch
    );
    assert!(model.is_empty());
    assert!(model.winning_op_id("e1").is_none());

    // a future epoch is accepted
    assert!(model.apply_op("e1", OpKind::Create, Some(&e1), "a", 1, 4).is_applied());
}

#[test]
fn create_needs_matching_entry() {
    let mut model = VaultModel::default();
    assert_eq!(
        model.apply_op("e1", OpKind::Create, None, "a", 1, 1),
        ApplyOutcome::InvalidEntry
    );
    let other = login("e2", "Other", "x", 1);
    assert_eq!(
        model.apply_op("e1", OpKind::Update, Some(&other), "a", 1, 1),
        ApplyOutcome::InvalidEntry
    );
    assert!(model.is_empty());
    assert!(model.winner("e1").is_none());
}

#[derive(Debug, Clone)]
struct Op {
    kind: OpKind,
    op_id: String,
    ts: i64,
    username: String,
}

impl Op {
    fn apply(&self, model: &mut VaultModel) {
        let entry: Option<VaultEntry> = match self.kind {
            OpKind::Delete => None,
            _ => Some(login("e1", "Site", &self.username, self.ts)),
        };
        model.apply_op("e1", self.kind, entry.as_ref(), &self.op_id, self.ts, 1);
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        prop_oneof![Just(OpKind::Create), Just(OpKind::Update), Just(OpKind::Delete)],
        "[a-f0-9]{4}",
        0i64..50,
        "[a-z]{1,6}",
    )
        .prop_map(|(kind, op_id, ts, username)| Op {
            kind,
            op_id,
            ts,
            username,
        })
}

proptest! {
    #[test]
    fn merge_order_does_not_matter(a in op_strategy(), b in op_strategy()) {
        // distinct ids; identical ids would be the same op
        prop_assume!(a.op_id != b.op_id);
        let mut ab = VaultModel::default();
        a.apply(&mut ab);
        b.apply(&mut ab);

        let mut ba = VaultModel::default();
        b.apply(&mut ba);
        a.apply(&mut ba);

        prop_assert_eq!(ab.get_entry("e1"), ba.get_entry("e1"));
        prop_assert_eq!(ab.winner("e1"), ba.winner("e1"));
    }

    #[test]
    fn any_permutation_converges(ops in proptest::collection::vec(op_strategy(), 1..8)) {
        let mut ids: Vec<&str> = ops.iter().map(|o| o.op_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assume!(ids.len() == ops.len());

        let mut forward = VaultModel::default();
        ops.iter().for_each(|o| o.apply(&mut forward));
        let mut backward = VaultModel::default();
        ops.iter().rev().for_each(|o| o.apply(&mut backward));

        prop_assert_eq!(forward.get_entry("e1"), backward.get_entry("e1"));
    }

    #[test]
    fn applying_twice_equals_applying_once(op in op_strategy()) {
        let mut once = VaultModel::default();
        op.apply(&mut once);
        let mut twice = once.clone();
        op.apply(&mut twice);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn old_epoch_is_ignored_whatever_the_timestamp(op in op_strategy(), ts in 0i64..i64::MAX) {
        let mut model = VaultModel::new(2);
        model.apply_op("e1", OpKind::Create, Some(&login("e1", "Site", "keep", 1)), "base", 1, 2);
        let before = model.clone();
        let entry = login("e1", "Site", &op.username, ts);
        let outcome = model.apply_op("e1", op.kind, Some(&entry), &op.op_id, ts, 1);
        prop_assert_eq!(outcome, ApplyOutcome::StaleEpoch);
        prop_assert_eq!(model, before);
    }

    #[test]
    fn tombstone_blocks_older_writes(older_ts in 0i64..=300, id in "[a-c][0-9a-f]{3}") {
        let mut model = VaultModel::default();
        model.apply_op("e1", OpKind::Delete, None, "d000", 300, 1);
        let entry = login("e1", "Site", "ghost", older_ts);
        // 'a'..'c' ids sort below "d000", so a tie also loses
        model.apply_op("e1", OpKind::Update, Some(&entry), &id, older_ts, 1);
        prop_assert!(model.get_entry("e1").is_none());
    }
}
