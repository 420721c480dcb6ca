// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Standard pre- and post-rollback checks.
//!
//! Checks are registered as name → predicate pairs on a [`Pipeline`]; the
//! pipeline runner provides ordering, timing and fail-fast.

use crate::context::{Ctx, RollbackContext};
use crate::pipeline::{Pipeline, StepResult};
use crate::RecoveryError;
use rb_adapters::operations;
use rb_core::{Clock, Phase, SnapshotKind};

pub const ENVIRONMENT_REACHABLE: &str = "environment-reachable";
pub const SNAPSHOTS_VALID: &str = "snapshots-valid";
pub const DATA_STORE_REACHABLE: &str = "data-store-reachable";

pub const LIVENESS_PROBE: &str = "liveness-probe";
pub const DATA_STORE_CONSISTENCY: &str = "data-store-consistency";
pub const CONFIGURATION_MATCHES: &str = "configuration-matches";
pub const SMOKE_TEST: &str = "smoke-test";

/// Checks run before anything in the environment is touched.
pub fn pre_checks<C: Clock>() -> Pipeline<RollbackContext<C>> {
    Pipeline::new(Phase::PreValidation)
        .step(ENVIRONMENT_REACHABLE, |ctx: Ctx<C>| async move {
            ctx.check_operation(ENVIRONMENT_REACHABLE, operations::ENVIRONMENT_PING).await
        })
        .step(SNAPSHOTS_VALID, |ctx: Ctx<C>| async move {
            snapshots_valid(&ctx).await
        })
        .step(DATA_STORE_REACHABLE, |ctx: Ctx<C>| async move {
            ctx.check_operation(DATA_STORE_REACHABLE, operations::DATA_STORE_PING).await
        })
}

/// Checks run after the execution steps have restored the target.
pub fn post_checks<C: Clock>() -> Pipeline<RollbackContext<C>> {
    Pipeline::new(Phase::PostValidation)
        .step(LIVENESS_PROBE, |ctx: Ctx<C>| async move {
            ctx.check_operation(LIVENESS_PROBE, operations::LIVENESS).await
        })
        .step(DATA_STORE_CONSISTENCY, |ctx: Ctx<C>| async move {
            ctx.check_operation(DATA_STORE_CONSISTENCY, operations::DATA_STORE_CONSISTENCY).await
        })
        .step(CONFIGURATION_MATCHES, |ctx: Ctx<C>| async move {
            configuration_matches(&ctx).await
        })
        .step(SMOKE_TEST, |ctx: Ctx<C>| async move {
            ctx.check_operation(SMOKE_TEST, operations::SMOKE_TEST).await
        })
}

/// Artifact storage is reachable and every snapshot of the target is usable.
async fn snapshots_valid<C: Clock>(ctx: &RollbackContext<C>) -> StepResult {
    let failed = |reason: String| RecoveryError::ValidationFailed {
        check: SNAPSHOTS_VALID.to_string(),
        reason,
    };

    ctx.snapshots
        .probe_storage()
        .await
        .map_err(|e| failed(format!("artifact storage unreachable: {e}")))?;

    let missing = ctx.point.missing_kinds();
    if !missing.is_empty() {
        let kinds: Vec<String> = missing.iter().map(|k| k.to_string()).collect();
        return Err(failed(format!("missing {} snapshot", kinds.join(", "))));
    }

    for kind in SnapshotKind::ALL {
        let snapshot = ctx.target_snapshot(kind)?;
        ctx.snapshots
            .check(snapshot, &ctx.environment)
            .await
            .map_err(|e| failed(e.to_string()))?;
    }
    Ok(None)
}

async fn configuration_matches<C: Clock>(ctx: &RollbackContext<C>) -> StepResult {
    let snapshot = ctx.target_snapshot(SnapshotKind::Configuration)?;
    ctx.snapshots.verify_configuration(snapshot).await.map_err(|reason| {
        RecoveryError::ValidationFailed { check: CONFIGURATION_MATCHES.to_string(), reason }
    })?;
    Ok(None)
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
