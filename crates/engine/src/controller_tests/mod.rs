// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery controller tests

mod auto_restore;
mod concurrency;
mod points;
mod scenarios;

use super::*;
use crate::test_helpers::TestContext;
use crate::{execution, validation};
use rb_core::{FakeClock, Phase};

fn options() -> RollbackOptions {
    RollbackOptions { requested_by: "tester".to_string(), ..RollbackOptions::default() }
}

/// Roll `env` back to `point` with default options.
async fn rollback(ctx: &TestContext, env: &str, point: &RollbackPoint) -> RollbackExecution {
    ctx.controller().request_rollback(env, point.id.as_str(), options()).await.unwrap()
}

fn names(exec: &RollbackExecution, phase: Phase) -> Vec<String> {
    exec.steps_in(phase).map(|s| s.name.clone()).collect()
}

fn declared(phase: Phase) -> Vec<String> {
    fn owned(names: Vec<&str>) -> Vec<String> {
        names.into_iter().map(String::from).collect()
    }
    match phase {
        Phase::PreValidation => owned(validation::pre_checks::<FakeClock>().names()),
        Phase::Execution => owned(execution::standard_steps::<FakeClock>(Duration::ZERO).names()),
        Phase::PostValidation => owned(validation::post_checks::<FakeClock>().names()),
    }
}

/// Structural properties every finished execution must satisfy.
///
/// - recorded steps of each phase are a prefix of that phase's list
/// - phases appear in order, and a phase only starts once the previous
///   phase fully succeeded
/// - at most one step failed, and it is the last one recorded
/// - the persisted record equals the returned one
fn assert_well_formed(ctx: &TestContext, exec: &RollbackExecution) {
    let phases = [Phase::PreValidation, Phase::Execution, Phase::PostValidation];
    let mut previous_complete = true;
    for phase in phases {
        let recorded = names(exec, phase);
        let expected = declared(phase);
        assert!(
            expected.starts_with(&recorded),
            "{phase} steps {recorded:?} are not a prefix of {expected:?}"
        );
        if !recorded.is_empty() {
            assert!(previous_complete, "{phase} started before the previous phase finished");
        }
        let phase_ok = exec.steps_in(phase).all(|s| s.status == StepStatus::Success);
        previous_complete = recorded.len() == expected.len() && phase_ok;
    }

    let order: Vec<Phase> = exec.steps.iter().map(|s| s.phase).collect();
    let mut sorted = order.clone();
    sorted.sort_by_key(|p| phases.iter().position(|q| q == p));
    assert_eq!(order, sorted, "steps out of phase order");

    let failed: Vec<_> = exec.steps.iter().filter(|s| s.status == StepStatus::Failed).collect();
    assert!(failed.len() <= 1, "more than one failed step");
    if let Some(step) = failed.first() {
        assert_eq!(exec.steps.last().map(|s| &s.name), Some(&step.name));
    }

    match exec.status {
        ExecutionStatus::Succeeded => {
            assert!(exec.failure.is_none());
            assert!(exec.completed_at_ms.is_some());
            assert_eq!(exec.steps.len(), 13);
        }
        ExecutionStatus::Failed => {
            assert!(exec.failure.is_some());
            assert!(exec.failed_at_ms.is_some());
        }
        other => panic!("execution left in non-terminal status {other}"),
    }

    let persisted = ctx.store.get_execution(exec.id.as_str()).unwrap();
    assert_eq!(&persisted, exec);
}
