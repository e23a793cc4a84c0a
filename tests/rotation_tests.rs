// tests/rotation_tests.rs

mod common;
mod support;

use support::{key, login};
use vault_sync_core::oplog::build_operation_at;
use vault_sync_core::{
    apply_snapshot_to_model, parse_and_apply, parse_snapshot, prepare_rotation, rotate_vault_key,
    ApplyOutcome, OpKind, OpOutcome, VaultModel,
};

fn populated() -> VaultModel {
    let mut model = VaultModel::default();
    model.apply_op("e1", OpKind::Create, Some(&login("e1", "GitHub", "alice", 10)), "a", 10, 1);
    model.apply_op("e2", OpKind::Create, Some(&login("e2", "GitLab", "bob", 20)), "b", 20, 1);
    model
}

#[test]
fn plan_copies_entries_and_bumps_epoch() {
    common::setup();
    let model = populated();
    let mut plan = prepare_rotation(&model);
    assert_eq!(plan.new_epoch, 2);
    assert_eq!(plan.entries.len(), 2);

    plan.entries[0].title = "mutated".into();
    assert!(model.list_entries().iter().all(|e| e.title != "mutated"));
    assert_eq!(model.epoch(), 1);
}

#[test]
fn rotated_snapshot_opens_only_under_the_new_key() {
    let old_key = key();
    let model = populated();
    let outcome = rotate_vault_key(&model, Some("b")).unwrap();

    assert_eq!(outcome.new_epoch, 2);
    assert_eq!(outcome.snapshot.epoch, 2);
    assert_eq!(outcome.snapshot.base_op_id.as_deref(), Some("b"));
    assert_ne!(outcome.new_key.expose_secret(), old_key.expose_secret());

    let entries = parse_snapshot(&outcome.snapshot.ciphertext, &outcome.new_key).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(parse_snapshot(&outcome.snapshot.ciphertext, &old_key).is_none());
}

#[test]
fn old_epoch_ops_are_ignored_after_adoption() {
    let old_key = key();
    let mut model = populated();
    let outcome = rotate_vault_key(&model, None).unwrap();
    apply_snapshot_to_model(&mut model, &outcome.entries, outcome.new_epoch);

    // A holder of the retired key forges a far-future update
    let forged = build_operation_at(
        OpKind::Update,
        "e1",
        Some(&login("e1", "GitHub", "mallory", i64::MAX)),
        None,
        1,
        "stolen-device",
        &old_key,
        i64::MAX,
    )
    .unwrap();
    let outcome_old_key = parse_and_apply(&forged.to_content().unwrap(), &old_key, &mut model);
    assert_eq!(outcome_old_key, OpOutcome::Rejected(ApplyOutcome::StaleEpoch));

    // Same op under the new key but still tagged epoch 1
    let tagged_old = build_operation_at(
        OpKind::Update,
        "e1",
        Some(&login("e1", "GitHub", "mallory", i64::MAX)),
        None,
        1,
        "stolen-device",
        &outcome.new_key,
        i64::MAX,
    )
    .unwrap();
    assert_eq!(
        parse_and_apply(&tagged_old.to_content().unwrap(), &outcome.new_key, &mut model),
        OpOutcome::Rejected(ApplyOutcome::StaleEpoch)
    );
    assert_eq!(model.get_entry("e1").unwrap().username.as_deref(), Some("alice"));
}
