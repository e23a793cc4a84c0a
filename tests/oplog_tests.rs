// tests/oplog_tests.rs
//! Op codec: building, parsing, silent drops

mod common;
mod support;

use serde_json::json;
use support::{key, login};
use vault_sync_core::core::{open_wire, seal_to_wire};
use vault_sync_core::error::CoreError;
use vault_sync_core::oplog::{build_operation_at, OpPayload};
use vault_sync_core::{
    build_operation, parse_and_apply, ApplyOutcome, OpKind, OpOutcome, VaultModel, VaultOperation,
};

#[test]
fn built_op_applies_on_another_model() {
    common::setup();
    let key = key();
    let entry = login("e1", "GitHub", "alice", 100);
    let op = build_operation(OpKind::Create, "e1", Some(&entry), None, 1, "laptop", &key).unwrap();

    assert_eq!(op.device_id, "laptop");
    assert_eq!(op.epoch, 1);
    assert!(op.prev.is_none());
    assert_eq!(op.op_id.len(), 36);

    let mut model = VaultModel::default();
    let outcome = parse_and_apply(&op.to_content().unwrap(), &key, &mut model);
    assert_eq!(outcome, OpOutcome::Applied);
    assert_eq!(model.get_entry("e1"), Some(entry));
    assert_eq!(model.winning_op_id("e1"), Some(op.op_id.as_str()));
}

#[test]
fn op_ids_are_unique() {
    let key = key();
    let entry = login("e1", "GitHub", "alice", 100);
    let a = build_operation(OpKind::Create, "e1", Some(&entry), None, 1, "d", &key).unwrap();
    let b = build_operation(OpKind::Create, "e1", Some(&entry), None, 1, "d", &key).unwrap();
    assert_ne!(a.op_id, b.op_id);
}

#[test]
fn delete_seals_a_placeholder_and_removes_entry() {
    let key = key();
    let mut model = VaultModel::default();
    let entry = login("e1", "GitHub", "alice", 100);
    let create = build_operation_at(OpKind::Create, "e1", Some(&entry), None, 1, "d", &key, 100).unwrap();
    parse_and_apply(&create.to_content().unwrap(), &key, &mut model);

    let delete = build_operation_at(
        OpKind::Delete,
        "e1",
        None,
        Some(&create.op_id),
        1,
        "d",
        &key,
        200,
    )
    .unwrap();
    assert_eq!(delete.prev.as_deref(), Some(create.op_id.as_str()));

    let payload: OpPayload =
        serde_json::from_slice(&open_wire(&delete.ciphertext, key.expose_secret()).unwrap()).unwrap();
    let placeholder = payload.entry.unwrap();
    assert_eq!(placeholder.id, "e1");
    assert!(placeholder.username.is_none());
    assert!(placeholder.title.is_empty());

    assert!(parse_and_apply(&delete.to_content().unwrap(), &key, &mut model).is_applied());
    assert!(model.get_entry("e1").is_none());
}

#[test]
fn create_without_entry_is_rejected_at_build_time() {
    let key = key();
    let err = build_operation(OpKind::Update, "e1", None, None, 1, "d", &key).unwrap_err();
    assert!(matches!(err, CoreError::InvalidEntry(_)));

    let other = login("e2", "Other", "x", 1);
    let err = build_operation(OpKind::Create, "e1", Some(&other), None, 1, "d", &key).unwrap_err();
    assert!(matches!(err, CoreError::InvalidEntry(_)));
}

#[test]
fn missing_fields_are_dropped_without_touching_the_model() {
    let key = key();
    let entry = login("e1", "GitHub", "alice", 100);
    let op = build_operation(OpKind::Create, "e1", Some(&entry), None, 1, "d", &key).unwrap();
    let full = op.to_content().unwrap();

    for field in ["op_id", "entry_id", "ciphertext", "epoch"] {
        let mut content = full.clone();
        content.as_object_mut().unwrap().remove(field);
        let mut model = VaultModel::default();
        assert_eq!(
            parse_and_apply(&content, &key, &mut model),
            OpOutcome::Malformed(field),
            "field {field}"
        );
        assert!(model.is_empty());
    }

    let mut model = VaultModel::default();
    assert_eq!(
        parse_and_apply(&json!("garbage"), &key, &mut model),
        OpOutcome::Malformed("content")
    );
    let mut unknown_kind = full.clone();
    unknown_kind["op"] = json!("merge");
    assert_eq!(
        parse_and_apply(&unknown_kind, &key, &mut model),
        OpOutcome::Malformed("op")
    );
}

#[test]
fn wrong_key_is_dropped() {
    let key = key();
    let other = support::key();
    let op = build_operation(
        OpKind::Create,
        "e1",
        Some(&login("e1", "GitHub", "alice", 1)),
        None,
        1,
        "d",
        &key,
    )
    .unwrap();
    let mut model = VaultModel::default();
    assert_eq!(
        parse_and_apply(&op.to_content().unwrap(), &other, &mut model),
        OpOutcome::Undecryptable
    );
    assert!(model.is_empty());
}

#[test]
fn undecodable_payload_is_dropped() {
    let key = key();
    let mut op = build_operation(
        OpKind::Create,
        "e1",
        Some(&login("e1", "GitHub", "alice", 1)),
        None,
        1,
        "d",
        &key,
    )
    .unwrap();
    op.ciphertext = seal_to_wire(b"not json", key.expose_secret()).unwrap();
    let mut model = VaultModel::default();
    assert_eq!(
        parse_and_apply(&op.to_content().unwrap(), &key, &mut model),
        OpOutcome::BadPayload
    );

    let no_entry = serde_json::to_vec(&OpPayload {
        schema_version: 1,
        entry: None,
    })
    .unwrap();
    op.ciphertext = seal_to_wire(&no_entry, key.expose_secret()).unwrap();
    assert_eq!(
        parse_and_apply(&op.to_content().unwrap(), &key, &mut model),
        OpOutcome::BadPayload
    );
    assert!(model.is_empty());
}

#[test]
fn entry_of_unknown_shape_is_dropped() {
    let key = key();
    let mut op = build_operation_at(
        OpKind::Create,
        "e1",
        Some(&login("e1", "GitHub", "alice", 1)),
        None,
        1,
        "d",
        &key,
        1,
    )
    .unwrap();
    let mut model = VaultModel::default();

    for entry in [
        json!({"id": "e1", "type": "wallet", "title": "Coins"}),
        json!({"id": "", "type": "login"}),
        json!({"type": "login", "title": "no id"}),
    ] {
        let payload = json!({"schema_version": 1, "entry": entry});
        op.ciphertext = seal_to_wire(payload.to_string().as_bytes(), key.expose_secret()).unwrap();
        assert_eq!(
            parse_and_apply(&op.to_content().unwrap(), &key, &mut model),
            OpOutcome::BadPayload
        );
    }
    assert!(model.is_empty());
}

#[test]
fn payload_from_a_newer_schema_is_dropped() {
    let key = key();
    let entry = login("e1", "GitHub", "alice", 1);
    let mut op = build_operation_at(OpKind::Create, "e1", Some(&entry), None, 1, "d", &key, 1).unwrap();
    let payload = json!({"schema_version": 2, "entry": entry});
    op.ciphertext = seal_to_wire(payload.to_string().as_bytes(), key.expose_secret()).unwrap();

    let mut model = VaultModel::default();
    assert_eq!(
        parse_and_apply(&op.to_content().unwrap(), &key, &mut model),
        OpOutcome::BadPayload
    );
    assert!(model.is_empty());
}

#[test]
fn stale_epoch_reaches_the_model_and_is_rejected() {
    let key = key();
    let op = build_operation(
        OpKind::Create,
        "e1",
        Some(&login("e1", "GitHub", "alice", 1)),
        None,
        1,
        "d",
        &key,
    )
    .unwrap();
    let mut model = VaultModel::new(2);
    assert_eq!(
        parse_and_apply(&op.to_content().unwrap(), &key, &mut model),
        OpOutcome::Rejected(ApplyOutcome::StaleEpoch)
    );
}

#[test]
fn content_round_trips_through_json() {
    let key = key();
    let op = build_operation(
        OpKind::Update,
        "e1",
        Some(&login("e1", "GitHub", "alice", 1)),
        Some("prev-op"),
        3,
        "d",
        &key,
    )
    .unwrap();
    let content = op.to_content().unwrap();
    assert_eq!(content["op"], "update");
    assert_eq!(content["prev"], "prev-op");
    assert_eq!(VaultOperation::from_content(&content).unwrap(), op);
}
