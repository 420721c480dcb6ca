// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::data_snapshot;

#[test]
fn builder_default_is_complete() {
    let point = RollbackPoint::builder().build();
    assert!(point.is_complete());
    assert!(point.missing_kinds().is_empty());
}

#[yare::parameterized(
    no_data_store    = { SnapshotKind::DataStore },
    no_configuration = { SnapshotKind::Configuration },
    no_app_code      = { SnapshotKind::ApplicationCode },
)]
fn missing_any_kind_is_incomplete(kind: SnapshotKind) {
    let mut point = RollbackPoint::builder().build();
    point.snapshots.remove(&kind);
    assert!(!point.is_complete());
    assert_eq!(point.missing_kinds(), vec![kind]);
}

#[test]
fn snapshot_under_wrong_key_is_incomplete() {
    let mut point = RollbackPoint::builder().build();
    point.snapshots.insert(SnapshotKind::Configuration, data_snapshot());
    assert!(!point.is_complete());
}

#[test]
fn deployment_marker_from_metadata() {
    let mut metadata = BTreeMap::new();
    metadata.insert(DEPLOYMENT_MARKER_KEY.to_string(), "channel-stable".to_string());
    let point = RollbackPoint::builder().metadata(metadata).build();
    assert_eq!(point.deployment_marker(), Some("channel-stable"));
    assert_eq!(RollbackPoint::builder().build().deployment_marker(), None);
}

#[test]
fn json_roundtrip_preserves_snapshots() {
    let point = RollbackPoint::builder().description("before 2.0").build();
    let json = serde_json::to_string(&point).unwrap();
    let parsed: RollbackPoint = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, point);
}

#[test]
fn purpose_defaults_to_manual_when_absent() {
    let point = RollbackPoint::builder().build();
    let mut json = serde_json::to_value(&point).unwrap();
    json.as_object_mut().unwrap().remove("purpose");
    let parsed: RollbackPoint = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.purpose, PointPurpose::Manual);
}
