// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback point creation and validation.

use super::*;

#[tokio::test]
async fn create_point_records_provenance() {
    let ctx = TestContext::new();
    ctx.vcs.set_revision("staging", "9f2c1e");
    ctx.vcs.set_version("staging", "v3.1.0");

    let point = ctx
        .controller()
        .create_point(
            PointRequest::new("staging", "alice")
                .description("before schema migration")
                .meta("ticket", "OPS-77")
                .marker("deploy-311"),
        )
        .await
        .unwrap();

    assert_eq!(point.environment, "staging");
    assert_eq!(point.created_by, "alice");
    assert_eq!(point.created_at_ms, 1_000_000);
    assert_eq!(point.description.as_deref(), Some("before schema migration"));
    assert_eq!(point.purpose, PointPurpose::Manual);
    assert_eq!(point.source_revision, "9f2c1e");
    assert_eq!(point.release_version, "v3.1.0");
    assert_eq!(point.metadata.get("ticket").map(String::as_str), Some("OPS-77"));
    assert_eq!(point.deployment_marker(), Some("deploy-311"));
    assert!(point.is_complete());
    assert_eq!(ctx.store.get_point(point.id.as_str()).unwrap(), point);
}

#[tokio::test]
async fn create_point_for_unknown_environment_is_rejected() {
    let ctx = TestContext::new();

    let err = ctx.controller().create_point(PointRequest::new("qa", "alice")).await.unwrap_err();

    assert!(matches!(err, RecoveryError::UnknownEnvironment(_)));
}

#[tokio::test]
async fn failed_capture_saves_nothing() {
    let ctx = TestContext::new();
    ctx.vcs.fail_current_revision("not a git repository");

    let err = ctx
        .controller()
        .create_point(PointRequest::new("staging", "alice"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecoveryError::CaptureFailed(ref msg) if msg.contains("not a git repository")
    ));
    assert!(ctx.store.list_points(None).is_empty());
    assert_eq!(ctx.artifact_count(), 0);
    assert!(!ctx.data.has_dump("staging-1.dump"));
}

#[tokio::test]
async fn fresh_point_validates_as_usable() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;

    let validation = ctx.controller().validate_point(point.id.as_str()).await.unwrap();

    assert!(validation.usable());
    assert_eq!(validation.point_id, point.id);
    let kinds: Vec<_> = validation.kinds.iter().map(|k| k.kind).collect();
    assert_eq!(kinds, SnapshotKind::ALL.to_vec());
}

#[tokio::test]
async fn validation_reports_each_broken_kind() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;
    ctx.data.lose_dump(&point.snapshot(SnapshotKind::DataStore).unwrap().locator);

    let validation = ctx.controller().validate_point(point.id.as_str()).await.unwrap();

    assert!(!validation.usable());
    let broken: Vec<_> = validation.kinds.iter().filter(|k| !k.valid).collect();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].kind, SnapshotKind::DataStore);
    assert!(broken[0].reason.as_deref().unwrap().contains("artifact not found"));
    // Validation never touches the environment.
    assert!(ctx.data.restored().is_empty());
    assert!(ctx.vcs.checkouts().is_empty());
}

#[tokio::test]
async fn validating_missing_point_is_not_found() {
    let ctx = TestContext::new();

    let err = ctx.controller().validate_point("rbp-missing").await.unwrap_err();

    assert!(matches!(err, RecoveryError::NotFound(_)));
}

#[test]
fn validation_with_missing_kind_is_not_usable() {
    let validation = PointValidation {
        point_id: PointId::new(),
        environment: "staging".to_string(),
        kinds: vec![KindValidity { kind: SnapshotKind::DataStore, valid: true, reason: None }],
    };

    assert!(!validation.usable());
}
