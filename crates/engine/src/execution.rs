// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Standard execution steps, in required order.
//!
//! Each step depends on the previous one succeeding. Steps are safe to re-run:
//! restores overwrite rather than merge, and service operations are expected
//! to be idempotent.

use crate::context::{Ctx, RollbackContext};
use crate::pipeline::{Pipeline, StepResult};
use rb_adapters::{operations, OperationRequest};
use rb_core::{Clock, Phase, SnapshotKind};
use std::time::Duration;

pub const STOP_SERVICES: &str = "stop-services";
pub const RESTORE_DATA_STORE: &str = "restore-data-store";
pub const RESTORE_CONFIGURATION: &str = "restore-configuration";
pub const RESTORE_APPLICATION_CODE: &str = "restore-application-code";
pub const APPLY_DEPLOYMENT_MARKER: &str = "apply-deployment-marker";
pub const RESUME_SERVICES: &str = "resume-services";

/// Restores are bounded by `restore_timeout`; other steps by the runner's.
pub fn standard_steps<C: Clock>(restore_timeout: Duration) -> Pipeline<RollbackContext<C>> {
    Pipeline::new(Phase::Execution)
        .step(STOP_SERVICES, |ctx: Ctx<C>| async move {
            let request = OperationRequest::new(&ctx.environment, operations::STOP_SERVICES);
            ctx.step_operation(request).await
        })
        .step_with_timeout(RESTORE_DATA_STORE, restore_timeout, |ctx: Ctx<C>| async move {
            restore(&ctx, SnapshotKind::DataStore).await
        })
        .step_with_timeout(RESTORE_CONFIGURATION, restore_timeout, |ctx: Ctx<C>| async move {
            restore(&ctx, SnapshotKind::Configuration).await
        })
        .step_with_timeout(RESTORE_APPLICATION_CODE, restore_timeout, |ctx: Ctx<C>| async move {
            restore(&ctx, SnapshotKind::ApplicationCode).await
        })
        .step(APPLY_DEPLOYMENT_MARKER, |ctx: Ctx<C>| async move {
            apply_marker(&ctx).await
        })
        .step(RESUME_SERVICES, |ctx: Ctx<C>| async move {
            let request = OperationRequest::new(&ctx.environment, operations::RESUME_SERVICES);
            ctx.step_operation(request).await
        })
}

async fn restore<C: Clock>(ctx: &RollbackContext<C>, kind: SnapshotKind) -> StepResult {
    let snapshot = ctx.target_snapshot(kind)?;
    ctx.snapshots.restore(snapshot, &ctx.environment).await?;
    Ok(None)
}

/// Re-apply the deployment marker recorded on the target, if any.
async fn apply_marker<C: Clock>(ctx: &RollbackContext<C>) -> StepResult {
    let Some(marker) = ctx.point.deployment_marker() else {
        return Ok(Some("no deployment marker recorded".to_string()));
    };
    let request = OperationRequest::new(&ctx.environment, operations::APPLY_MARKER)
        .var("RB_MARKER", marker)
        .var("RB_RELEASE_VERSION", &ctx.point.release_version);
    ctx.step_operation(request).await
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
