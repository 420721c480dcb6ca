// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end rollbacks against fake collaborators.

use super::*;
use rb_adapters::operations;

#[tokio::test]
async fn successful_rollback_returns_environment_to_point() {
    let ctx = TestContext::new();
    let original_config = ctx.read_config("production");
    let point = ctx.create_point("production").await;
    ctx.clock.advance(Duration::from_secs(3_600));
    ctx.deploy("production", "v2");

    let exec = rollback(&ctx, "production", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Succeeded);
    assert_eq!(names(&exec, Phase::PreValidation).len(), 3);
    assert_eq!(names(&exec, Phase::Execution).len(), 6);
    assert_eq!(names(&exec, Phase::PostValidation).len(), 4);
    assert!(exec.steps.iter().all(|s| s.status == StepStatus::Success));
    assert!(exec.restore_attempts.is_empty());
    assert_eq!(exec.point_id, point.id);
    assert_eq!(exec.requested_by, "tester");

    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v1"));
    assert_eq!(ctx.read_config("production"), original_config);
    assert_eq!(ctx.vcs.revision("production"), "abc123");
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn successful_rollback_keeps_safety_point_of_prior_state() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");

    let exec = rollback(&ctx, "production", &point).await;

    let safety_id = exec.safety_point_id.clone().unwrap();
    let safety = ctx.store.get_point(safety_id.as_str()).unwrap();
    assert_eq!(safety.purpose, PointPurpose::Safety);
    assert_eq!(safety.environment, "production");
    assert_eq!(safety.source_revision, "rev-v2");
    assert_eq!(safety.metadata.get(SAFETY_EXECUTION_KEY), Some(&exec.id.to_string()));
    assert!(safety.is_complete());
    assert_eq!(ctx.store.list_points(Some("production")).len(), 2);
}

#[tokio::test]
async fn pre_check_failure_touches_nothing() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    ctx.shell.fail(operations::DATA_STORE_PING, "connection refused");

    let exec = rollback(&ctx, "production", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Failed);
    let failure = exec.failure.clone().unwrap();
    assert_eq!(failure.phase, ExecutionStatus::Validating);
    assert_eq!(failure.step, validation::DATA_STORE_REACHABLE);
    assert!(failure.cause.contains("connection refused"));

    assert_eq!(exec.steps.len(), 3);
    assert!(names(&exec, Phase::Execution).is_empty());
    assert_eq!(exec.safety_point_id, None);
    assert!(exec.restore_attempts.is_empty());
    assert_eq!(ctx.store.list_points(Some("production")).len(), 1);

    assert!(ctx.data.restored().is_empty());
    assert!(ctx.vcs.checkouts().is_empty());
    assert!(!ctx.shell.operations().iter().any(|op| op == operations::STOP_SERVICES));
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v2"));
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn failed_data_restore_is_auto_restored_from_safety_point() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    let deployed_config = ctx.read_config("production");
    ctx.data.fail_restore_once("disk full");

    let exec = rollback(&ctx, "production", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Failed);
    let failure = exec.failure.clone().unwrap();
    assert_eq!(failure.phase, ExecutionStatus::Executing);
    assert_eq!(failure.step, execution::RESTORE_DATA_STORE);
    assert!(failure.cause.contains("disk full"), "{}", failure.cause);
    assert_eq!(names(&exec, Phase::Execution), vec!["stop-services", "restore-data-store"]);

    let kinds: Vec<_> = exec.restore_attempts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, SnapshotKind::ALL.to_vec());
    assert!(exec.restore_attempts.iter().all(|a| a.status == StepStatus::Success));

    let safety = ctx.store.get_point(exec.safety_point_id.as_ref().unwrap().as_str()).unwrap();
    let target_dump = &point.snapshot(SnapshotKind::DataStore).unwrap().locator;
    let safety_dump = &safety.snapshot(SnapshotKind::DataStore).unwrap().locator;
    assert_eq!(ctx.data.restored(), vec![target_dump.clone(), safety_dump.clone()]);

    // Back to the pre-rollback deployment, not the target.
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v2"));
    assert_eq!(ctx.read_config("production"), deployed_config);
    assert_eq!(ctx.vcs.revision("production"), "rev-v2");
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn fifty_first_point_evicts_oldest_and_its_artifacts() {
    let ctx = TestContext::new();
    let controller = ctx.controller();
    let other = ctx.create_point("staging").await;

    let mut created = Vec::new();
    for _ in 0..50 {
        ctx.clock.advance(Duration::from_secs(60));
        created.push(controller.create_point(PointRequest::new("production", "ci")).await.unwrap());
    }
    assert_eq!(ctx.store.list_points(Some("production")).len(), 50);

    ctx.clock.advance(Duration::from_secs(60));
    let newest = controller.create_point(PointRequest::new("production", "ci")).await.unwrap();

    let listing = ctx.store.list_points(Some("production"));
    assert_eq!(listing.len(), 50);
    let ids: Vec<_> = listing.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids.first(), Some(&newest.id));
    assert!(!ids.contains(&created[0].id));
    assert!(ids.contains(&created[1].id));

    let oldest = &created[0];
    assert!(matches!(
        controller.validate_point(oldest.id.as_str()).await,
        Err(RecoveryError::NotFound(_))
    ));
    assert!(!ctx.data.has_dump(&oldest.snapshot(SnapshotKind::DataStore).unwrap().locator));
    let config_locator = &oldest.snapshot(SnapshotKind::Configuration).unwrap().locator;
    assert!(!ctx.artifacts.exists(config_locator));

    // Other environments are unaffected.
    assert!(ctx.store.get_point(other.id.as_str()).is_ok());
    assert_eq!(ctx.artifact_count(), 51);
}

#[tokio::test]
async fn rollback_succeeds_with_no_optional_operations_configured() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;
    for op in operations::ALL {
        ctx.shell.unconfigure(op);
    }
    ctx.deploy("staging", "v2");

    let exec = rollback(&ctx, "staging", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Succeeded);
    let skipped: Vec<_> = exec
        .steps
        .iter()
        .filter(|s| s.detail.as_deref() == Some(crate::SKIPPED))
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(
        skipped,
        vec![
            validation::ENVIRONMENT_REACHABLE,
            validation::DATA_STORE_REACHABLE,
            execution::STOP_SERVICES,
            execution::RESUME_SERVICES,
            validation::LIVENESS_PROBE,
            validation::DATA_STORE_CONSISTENCY,
            validation::SMOKE_TEST,
        ]
    );
    assert_eq!(ctx.data.data("staging").as_deref(), Some("rows=v1"));
}
