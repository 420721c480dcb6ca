// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request rejection, environment exclusivity and crash reconciliation.

use super::*;
use rb_adapters::operations;

#[tokio::test]
async fn concurrent_rollback_of_same_environment_is_rejected() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.shell.hold(operations::STOP_SERVICES);
    let controller = ctx.controller();

    let (first, (second, persisted)) = tokio::join!(
        controller.request_rollback("production", point.id.as_str(), options()),
        async {
            ctx.shell.entered(operations::STOP_SERVICES).await;
            let second =
                controller.request_rollback("production", point.id.as_str(), options()).await;
            let persisted = ctx.store.list_executions(Some("production")).len();
            ctx.shell.release(operations::STOP_SERVICES);
            (second, persisted)
        }
    );

    assert!(matches!(
        second,
        Err(RecoveryError::ExecutionInProgress(ref env)) if env == "production"
    ));
    assert_eq!(persisted, 1);
    assert_eq!(first.unwrap().status, ExecutionStatus::Succeeded);
    assert_eq!(ctx.store.list_executions(Some("production")).len(), 1);
}

#[tokio::test]
async fn second_controller_on_same_state_is_rejected() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.shell.hold(operations::STOP_SERVICES);
    let first_controller = ctx.controller();
    let second_controller = ctx.controller();

    let (first, second) = tokio::join!(
        first_controller.request_rollback("production", point.id.as_str(), options()),
        async {
            ctx.shell.entered(operations::STOP_SERVICES).await;
            let second = second_controller
                .request_rollback("production", point.id.as_str(), options())
                .await;
            ctx.shell.release(operations::STOP_SERVICES);
            second
        }
    );

    assert!(matches!(second, Err(RecoveryError::ExecutionInProgress(_))));
    assert_eq!(first.unwrap().status, ExecutionStatus::Succeeded);
}

#[tokio::test]
async fn rollback_in_progress_blocks_point_creation_only_for_its_environment() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    ctx.shell.hold(operations::STOP_SERVICES);
    let controller = ctx.controller();

    let (first, (same_env, other_env)) = tokio::join!(
        controller.request_rollback("production", point.id.as_str(), options()),
        async {
            ctx.shell.entered(operations::STOP_SERVICES).await;
            let same_env = controller.create_point(PointRequest::new("production", "ci")).await;
            let other_env = controller.create_point(PointRequest::new("staging", "ci")).await;
            ctx.shell.release(operations::STOP_SERVICES);
            (same_env, other_env)
        }
    );

    assert!(matches!(same_env, Err(RecoveryError::ExecutionInProgress(_))));
    assert_eq!(other_env.unwrap().environment, "staging");
    assert_eq!(first.unwrap().status, ExecutionStatus::Succeeded);
}

#[tokio::test]
async fn lock_is_released_after_each_rollback() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;
    let controller = ctx.controller();

    let first = controller.request_rollback("staging", point.id.as_str(), options()).await;
    let second = controller.request_rollback("staging", point.id.as_str(), options()).await;

    assert_eq!(first.unwrap().status, ExecutionStatus::Succeeded);
    assert_eq!(second.unwrap().status, ExecutionStatus::Succeeded);
    assert_eq!(ctx.store.list_executions(Some("staging")).len(), 2);
}

#[tokio::test]
async fn controllers_with_separate_stores_keep_each_others_records() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    let other = ctx.controller_on(ctx.open_store());

    let first = rollback(&ctx, "production", &point).await;
    let second =
        other.request_rollback("production", point.id.as_str(), options()).await.unwrap();

    assert_eq!(first.status, ExecutionStatus::Succeeded);
    assert_eq!(second.status, ExecutionStatus::Succeeded);
    let on_disk = ctx.open_store();
    assert_eq!(on_disk.get_execution(first.id.as_str()).unwrap(), first);
    assert_eq!(on_disk.get_execution(second.id.as_str()).unwrap(), second);
    for exec in [&first, &second] {
        let safety = exec.safety_point_id.as_ref().unwrap();
        assert!(on_disk.get_point(safety.as_str()).is_ok());
    }
    assert_eq!(on_disk.list_points(Some("production")).len(), 3);
}

#[tokio::test]
async fn point_created_by_another_store_is_visible() {
    let ctx = TestContext::new();
    let other = ctx.controller_on(ctx.open_store());
    let point = other.create_point(PointRequest::new("production", "ci")).await.unwrap();

    let exec = rollback(&ctx, "production", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Succeeded);
    assert_eq!(ctx.open_store().list_points(Some("production")).len(), 2);
}

#[tokio::test]
async fn interrupted_execution_is_failed_before_new_one_starts() {
    let ctx = TestContext::new();
    let point = ctx.create_point("production").await;
    let mut stale = RollbackExecution::new(point.id.clone(), "production", "crashed", true, 1);
    stale.transition(ExecutionStatus::Validating, 2).unwrap();
    stale.transition(ExecutionStatus::Executing, 3).unwrap();
    ctx.store.save_execution(&stale).unwrap();

    let exec = rollback(&ctx, "production", &point).await;

    assert_eq!(exec.status, ExecutionStatus::Succeeded);
    let stale = ctx.store.get_execution(stale.id.as_str()).unwrap();
    assert_eq!(stale.status, ExecutionStatus::Failed);
    let failure = stale.failure.unwrap();
    assert_eq!(failure.phase, ExecutionStatus::Executing);
    assert_eq!(failure.step, "interrupted");
    assert!(ctx.store.active_execution("production").is_none());
}

#[tokio::test]
async fn unknown_environment_is_rejected() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;

    let err = ctx
        .controller()
        .request_rollback("qa", point.id.as_str(), options())
        .await
        .unwrap_err();

    assert!(matches!(err, RecoveryError::UnknownEnvironment(ref env) if env == "qa"));
    assert!(ctx.store.list_executions(None).is_empty());
}

#[tokio::test]
async fn missing_point_is_rejected() {
    let ctx = TestContext::new();

    let err = ctx
        .controller()
        .request_rollback("staging", "rbp-doesnotexist", options())
        .await
        .unwrap_err();

    assert!(matches!(err, RecoveryError::NotFound(ref id) if id == "rbp-doesnotexist"));
    assert!(ctx.store.list_executions(None).is_empty());
}

#[tokio::test]
async fn point_from_other_environment_is_rejected() {
    let ctx = TestContext::new();
    let point = ctx.create_point("staging").await;
    ctx.deploy("production", "v2");

    let err = ctx
        .controller()
        .request_rollback("production", point.id.as_str(), options())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecoveryError::EnvironmentMismatch { ref point_environment, ref requested, .. }
            if point_environment == "staging" && requested == "production"
    ));
    assert!(ctx.store.list_executions(None).is_empty());
    assert!(ctx.data.restored().is_empty());
    assert_eq!(ctx.data.data("production").as_deref(), Some("rows=v2"));
}
