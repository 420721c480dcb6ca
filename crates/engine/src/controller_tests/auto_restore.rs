// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safety points, auto-restore, cancellation and progress events.

use super::*;
use crate::EventSink;
use rb_adapters::operations;
use tokio::sync::mpsc;

#[tokio::test]
async fn post_validation_failure_restores_pre_rollback_state() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    let deployed_config = ctx.read_config("production");
    ctx.shell.fail(operations::SMOKE_TEST, "checkout flow returned 500");

    let exec = rollback(&ctx, "production", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Failed);
    let failure = exec.failure.clone().unwrap();
    assert_eq!(failure.phase, ExecutionStatus::PostValidating);
    assert_eq!(failure.step, validation::SMOKE_TEST);
    assert_eq!(exec.steps.len(), 13);

    assert_eq!(exec.restore_attempts.len(), 3);
    assert!(exec.restore_attempts.iter().all(|a| a.status == StepStatus::Success));
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v2"));
    assert_eq!(ctx.read_config("production"), deployed_config);
    assert_eq!(ctx.vcs.revision("production"), "rev-v2");
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn disabled_auto_restore_leaves_environment_as_is() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    ctx.shell.fail(operations::SMOKE_TEST, "checkout flow returned 500");

    let options = RollbackOptions { auto_restore: false, ..options() };
    let exec = ctx
        .controller()
        .request_rollback("production", point.id.as_str(), options)
        .await
        .unwrap();

    assert_eq!(exec.status, ExecutionStatus::Failed);
    assert!(!exec.auto_restore);
    assert!(exec.restore_attempts.is_empty());
    // Target state stays in place.
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v1"));
    assert_eq!(ctx.vcs.revision("production"), "abc123");
    assert_eq!(ctx.data.restored().len(), 1);
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn failed_auto_restore_keeps_root_cause() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    let deployed_config = ctx.read_config("production");
    ctx.data.fail_restore("disk full");

    let exec = rollback(&ctx, "production", &point).await;

    let failure = exec.failure.clone().unwrap();
    assert_eq!(failure.step, execution::RESTORE_DATA_STORE);
    assert!(failure.cause.contains("disk full"));

    let attempts: Vec<_> = exec.restore_attempts.iter().map(|a| (a.kind, a.status)).collect();
    assert_eq!(
        attempts,
        vec![
            (SnapshotKind::DataStore, StepStatus::Failed),
            (SnapshotKind::Configuration, StepStatus::Success),
            (SnapshotKind::ApplicationCode, StepStatus::Success),
        ]
    );
    assert!(exec.restore_attempts[0].error.as_deref().unwrap().contains("disk full"));
    // One auto-restore pass only.
    assert_eq!(ctx.data.restored().len(), 2);
    assert_eq!(ctx.read_config("production"), deployed_config);
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn failed_safety_capture_fails_closed() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    ctx.data.fail_dump("no space left on device");

    let exec = rollback(&ctx, "production", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Failed);
    let failure = exec.failure.clone().unwrap();
    assert_eq!(failure.phase, ExecutionStatus::Validating);
    assert_eq!(failure.step, SAFETY_SNAPSHOT);
    assert!(failure.cause.contains("no space left on device"));

    assert_eq!(exec.safety_point_id, None);
    assert!(names(&exec, Phase::Execution).is_empty());
    assert!(exec.restore_attempts.is_empty());
    assert_eq!(ctx.store.list_points(Some("production")).len(), 1);
    // The partial safety capture was discarded; only the target's artifact remains.
    assert_eq!(ctx.artifact_count(), 1);
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v2"));
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn store_failure_mid_execution_still_restores() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    let deployed_config = ctx.read_config("production");
    ctx.shell.hold(operations::STOP_SERVICES);
    let controller = ctx.controller();
    let blocker = ctx.catalog_file("production").with_extension("json.tmp");

    let (result, ()) = tokio::join!(
        controller.request_rollback("production", point.id.as_str(), options()),
        async {
            ctx.shell.entered(operations::STOP_SERVICES).await;
            std::fs::create_dir(&blocker).unwrap();
            ctx.shell.release(operations::STOP_SERVICES);
        }
    );

    // The catalog stayed unwritable, so the final write fails too, but only
    // after the safety point was restored.
    assert!(matches!(result, Err(RecoveryError::Store(_))));
    assert_eq!(ctx.data.restored().len(), 2);
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v2"));
    assert_eq!(ctx.read_config("production"), deployed_config);
    assert_eq!(ctx.vcs.revision("production"), "rev-v2");

    // Once writable again, the next request fails the stuck record.
    std::fs::remove_dir(&blocker).unwrap();
    let stuck = ctx.store.active_execution("production").unwrap();
    let next = rollback(&ctx, "production", &point).await;
    assert_eq!(next.status, ExecutionStatus::Succeeded);
    let stuck = ctx.store.get_execution(stuck.id.as_str()).unwrap();
    assert_eq!(stuck.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn unavailable_safety_point_is_recorded_per_kind() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    ctx.shell.fail(operations::SMOKE_TEST, "checkout flow returned 500");
    ctx.shell.hold(operations::STOP_SERVICES);
    let controller = ctx.controller();

    let (exec, ()) = tokio::join!(
        controller.request_rollback("production", point.id.as_str(), options()),
        async {
            ctx.shell.entered(operations::STOP_SERVICES).await;
            let active = ctx.store.active_execution("production").unwrap();
            let safety_id = active.safety_point_id.unwrap().to_string();
            let path = ctx.catalog_file("production");
            let mut catalog: serde_json::Value =
                serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
            catalog["points"]
                .as_array_mut()
                .unwrap()
                .retain(|entry| entry["record"]["id"] != safety_id.as_str());
            std::fs::write(&path, serde_json::to_vec(&catalog).unwrap()).unwrap();
            ctx.store.refresh("production").unwrap();
            ctx.shell.release(operations::STOP_SERVICES);
        }
    );
    let exec = exec.unwrap();

    assert_eq!(exec.failure.clone().unwrap().step, validation::SMOKE_TEST);
    let attempts: Vec<_> = exec.restore_attempts.iter().map(|a| (a.kind, a.status)).collect();
    let expected: Vec<_> = SnapshotKind::ALL.iter().map(|&k| (k, StepStatus::Failed)).collect();
    assert_eq!(attempts, expected);
    for attempt in &exec.restore_attempts {
        assert!(attempt.error.as_deref().unwrap().contains("safety point unavailable"));
    }
    // Nothing was restored; the target state stays in place.
    assert_eq!(ctx.data.restored().len(), 1);
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v1"));
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn cancelled_before_start_fails_without_side_effects() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    let options = options();
    options.cancel.cancel();

    let exec = ctx
        .controller()
        .request_rollback("production", point.id.as_str(), options)
        .await
        .unwrap();

    assert_eq!(exec.status, ExecutionStatus::Failed);
    let failure = exec.failure.clone().unwrap();
    assert_eq!(failure.step, validation::ENVIRONMENT_REACHABLE);
    assert_eq!(failure.cause, "cancelled");
    assert!(exec.steps.is_empty());
    assert_eq!(exec.safety_point_id, None);
    assert_well_formed(&ctx, &exec);
}

#[tokio::test]
async fn cancellation_mid_execution_stops_at_next_step_and_restores() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.deploy("production", "v2");
    ctx.shell.hold(operations::STOP_SERVICES);
    let controller = ctx.controller();
    let options = options();
    let cancel = options.cancel.clone();

    let (exec, ()) = tokio::join!(
        controller.request_rollback("production", point.id.as_str(), options),
        async {
            ctx.shell.entered(operations::STOP_SERVICES).await;
            cancel.cancel();
            ctx.shell.release(operations::STOP_SERVICES);
        }
    );
    let exec = exec.unwrap();

    // The in-flight step completes; the next one is never started.
    assert_eq!(names(&exec, Phase::Execution), vec![execution::STOP_SERVICES]);
    let failure = exec.failure.clone().unwrap();
    assert_eq!(failure.step, execution::RESTORE_DATA_STORE);
    assert_eq!(failure.cause, "cancelled");
    assert_eq!(exec.restore_attempts.len(), 3);
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v2"));
    assert_well_formed(&ctx, &exec);
}

async fn collect(mut rx: mpsc::Receiver<RollbackEvent>) -> Vec<RollbackEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn statuses(events: &[RollbackEvent]) -> Vec<ExecutionStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            RollbackEvent::StatusChanged { status, .. } => Some(*status),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn events_trace_a_successful_rollback() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;
    let (tx, rx) = mpsc::channel(256);
    let controller = ctx.controller().with_events(EventSink::new(tx));

    let exec = controller.request_rollback("staging", point.id.as_str(), options()).await.unwrap();
    drop(controller);
    let events = collect(rx).await;

    assert_eq!(
        statuses(&events),
        vec![
            ExecutionStatus::Validating,
            ExecutionStatus::Executing,
            ExecutionStatus::PostValidating,
            ExecutionStatus::Succeeded,
        ]
    );
    let finished = events.iter().filter(|e| matches!(e, RollbackEvent::StepFinished { .. }));
    assert_eq!(finished.count(), 13);
    let safety_id = exec.safety_point_id.as_ref();
    assert!(events.iter().any(|e| matches!(
        e,
        RollbackEvent::SafetyPointCaptured { point_id, .. } if Some(point_id) == safety_id
    )));
    assert!(events.iter().all(|e| match e {
        RollbackEvent::StatusChanged { execution_id, .. }
        | RollbackEvent::StepStarted { execution_id, .. }
        | RollbackEvent::StepFinished { execution_id, .. }
        | RollbackEvent::SafetyPointCaptured { execution_id, .. }
        | RollbackEvent::AutoRestoreStarted { execution_id, .. }
        | RollbackEvent::AutoRestoreAttempted { execution_id, .. } => *execution_id == exec.id,
    }));
}

#[tokio::test]
async fn events_report_auto_restore_after_failure() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;
    ctx.shell.fail(operations::LIVENESS, "no heartbeat");
    let (tx, rx) = mpsc::channel(256);
    let controller = ctx.controller().with_events(EventSink::new(tx));

    controller.request_rollback("staging", point.id.as_str(), options()).await.unwrap();
    drop(controller);
    let events = collect(rx).await;

    assert_eq!(statuses(&events).last(), Some(&ExecutionStatus::Failed));
    let failed_at = events
        .iter()
        .position(|e| {
            matches!(e, RollbackEvent::StatusChanged { status: ExecutionStatus::Failed, .. })
        })
        .unwrap();
    let started_at = events
        .iter()
        .position(|e| matches!(e, RollbackEvent::AutoRestoreStarted { .. }))
        .unwrap();
    assert!(failed_at < started_at, "root cause recorded before auto-restore");
    let attempted: Vec<_> = events[started_at..]
        .iter()
        .filter_map(|e| match e {
            RollbackEvent::AutoRestoreAttempted { attempt, .. } => Some(attempt.kind),
            _ => None,
        })
        .collect();
    assert_eq!(attempted, SnapshotKind::ALL.to_vec());
}
