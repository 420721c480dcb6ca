// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback executions and their status state machine.
//!
//! ```text
//! pending → validating → executing → post_validating → succeeded
//!               │            │              │
//!               └────────────┴──────────────┴──→ failed
//! ```

use crate::point::PointId;
use crate::snapshot::SnapshotKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for one rollback attempt.
    pub struct ExecutionId("rbx-");
}

/// Lifecycle status of a rollback execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Validating,
    Executing,
    PostValidating,
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Succeeded | ExecutionStatus::Failed)
    }

    /// Allowed transitions. No transition skips a phase.
    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Pending, Validating)
                | (Validating, Executing)
                | (Executing, PostValidating)
                | (PostValidating, Succeeded)
                | (Validating, Failed)
                | (Executing, Failed)
                | (PostValidating, Failed)
        )
    }

    /// Pipeline phase that runs while in this status, if any.
    pub fn phase(self) -> Option<Phase> {
        match self {
            ExecutionStatus::Validating => Some(Phase::PreValidation),
            ExecutionStatus::Executing => Some(Phase::Execution),
            ExecutionStatus::PostValidating => Some(Phase::PostValidation),
            _ => None,
        }
    }
}

crate::simple_display! {
    ExecutionStatus {
        Pending => "pending",
        Validating => "validating",
        Executing => "executing",
        PostValidating => "post_validating",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

/// Pipeline phase a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    PreValidation,
    Execution,
    PostValidation,
}

crate::simple_display! {
    Phase {
        PreValidation => "pre-validation",
        Execution => "execution",
        PostValidation => "post-validation",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
}

crate::simple_display! {
    StepStatus {
        Success => "success",
        Failed => "failed",
    }
}

/// Record of one unit of work within a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub name: String,
    pub phase: Phase,
    pub started_at_ms: u64,
    pub completed_at_ms: u64,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Extra context from a successful step (e.g. "skipped: not configured").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ExecutionStep {
    pub fn elapsed_ms(&self) -> u64 {
        self.completed_at_ms.saturating_sub(self.started_at_ms)
    }
}

/// Root cause of a failed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    /// Status the execution was in when it failed.
    pub phase: ExecutionStatus,
    /// Failing step, or a pseudo-step such as `safety-snapshot`.
    pub step: String,
    pub cause: String,
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed at step `{}`: {}", self.phase, self.step, self.cause)
    }
}

/// Outcome of restoring one safety snapshot kind after a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreAttempt {
    pub kind: SnapshotKind,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status transition {from} → {to}")]
pub struct InvalidTransition {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}

/// One attempt to revert an environment to a rollback point.
///
/// Mutated only by appending steps and advancing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackExecution {
    pub id: ExecutionId,
    pub point_id: PointId,
    pub environment: String,
    pub requested_by: String,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at_ms: Option<u64>,
    pub status: ExecutionStatus,
    pub auto_restore: bool,
    #[serde(default)]
    pub steps: Vec<ExecutionStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_point_id: Option<PointId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureCause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restore_attempts: Vec<RestoreAttempt>,
}

impl RollbackExecution {
    pub fn new(
        point_id: PointId,
        environment: impl Into<String>,
        requested_by: impl Into<String>,
        auto_restore: bool,
        now_ms: u64,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            point_id,
            environment: environment.into(),
            requested_by: requested_by.into(),
            started_at_ms: now_ms,
            completed_at_ms: None,
            failed_at_ms: None,
            status: ExecutionStatus::Pending,
            auto_restore,
            steps: Vec::new(),
            safety_point_id: None,
            failure: None,
            restore_attempts: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Advance to `next`, rejecting any transition the state machine forbids.
    pub fn transition(
        &mut self,
        next: ExecutionStatus,
        now_ms: u64,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        if next == ExecutionStatus::Succeeded {
            self.completed_at_ms = Some(now_ms);
        }
        Ok(())
    }

    /// Move to `failed`, recording the root cause.
    ///
    /// The first recorded cause wins; later failures never replace it.
    pub fn fail(
        &mut self,
        step: impl Into<String>,
        cause: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), InvalidTransition> {
        let phase = self.status;
        self.transition(ExecutionStatus::Failed, now_ms)?;
        self.failed_at_ms = Some(now_ms);
        if self.failure.is_none() {
            self.failure = Some(FailureCause { phase, step: step.into(), cause: cause.into() });
        }
        Ok(())
    }

    /// Mark an execution abandoned by a crashed process as failed.
    ///
    /// Bypasses the transition table since the process that owned it is gone.
    pub fn mark_interrupted(&mut self, now_ms: u64) {
        if self.is_terminal() {
            return;
        }
        let phase = self.status;
        self.status = ExecutionStatus::Failed;
        self.failed_at_ms = Some(now_ms);
        if self.failure.is_none() {
            self.failure = Some(FailureCause {
                phase,
                step: "interrupted".to_string(),
                cause: "owning process exited before the execution finished".to_string(),
            });
        }
    }

    pub fn steps_in(&self, phase: Phase) -> impl Iterator<Item = &ExecutionStep> {
        self.steps.iter().filter(move |s| s.phase == phase)
    }

    /// Epoch ms at which the execution reached a terminal status.
    pub fn finished_at_ms(&self) -> Option<u64> {
        self.completed_at_ms.or(self.failed_at_ms)
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
