// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared context handed to every check and step of a rollback.

use crate::pipeline::StepResult;
use crate::snapshot_manager::SnapshotManager;
use crate::RecoveryError;
use rb_adapters::{AdapterError, OperationRequest, ProcessOutput};
use rb_core::{Clock, RollbackPoint, Snapshot, SnapshotKind};
use std::sync::Arc;

/// Step detail recorded when an operation has no configured command.
pub const SKIPPED: &str = "skipped: not configured";

/// Shared handle passed to each check and step.
pub type Ctx<C> = Arc<RollbackContext<C>>;

pub struct RollbackContext<C: Clock> {
    pub environment: String,
    /// Target of the rollback.
    pub point: RollbackPoint,
    pub snapshots: Arc<SnapshotManager<C>>,
}

impl<C: Clock> RollbackContext<C> {
    /// Run `operation`, or `Ok(None)` when it is not configured.
    async fn operation(
        &self,
        request: OperationRequest,
    ) -> Result<Option<ProcessOutput>, AdapterError> {
        match self.snapshots.shell().run(request).await {
            Ok(output) => Ok(Some(output)),
            Err(e) if e.is_not_configured() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run `operation` as a check: non-zero exit fails the check.
    pub async fn check_operation(&self, check: &str, operation: &str) -> StepResult {
        let request = OperationRequest::new(&self.environment, operation);
        match self.operation(request).await {
            Ok(None) => Ok(Some(SKIPPED.to_string())),
            Ok(Some(output)) if output.success() => Ok(None),
            Ok(Some(output)) => {
                let reason = match output.stderr.trim() {
                    "" => format!("{operation} exited with code {}", output.exit_code),
                    stderr => stderr.to_string(),
                };
                Err(RecoveryError::ValidationFailed { check: check.to_string(), reason })
            }
            Err(AdapterError::Timeout { after, .. }) => {
                Err(RecoveryError::Timeout { step: check.to_string(), after })
            }
            Err(e) => Err(RecoveryError::ValidationFailed {
                check: check.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Run `request` as an execution step: any failure is a collaborator error.
    pub async fn step_operation(&self, request: OperationRequest) -> StepResult {
        let operation = request.operation.clone();
        match self.operation(request).await {
            Ok(None) => Ok(Some(SKIPPED.to_string())),
            Ok(Some(output)) => match output.into_result(&operation) {
                Ok(_) => Ok(None),
                Err(source) => Err(RecoveryError::ExternalCollaborator { operation, source }),
            },
            Err(AdapterError::Timeout { after, .. }) => {
                Err(RecoveryError::Timeout { step: operation, after })
            }
            Err(source) => Err(RecoveryError::ExternalCollaborator { operation, source }),
        }
    }

    /// The target's snapshot of `kind`.
    pub fn target_snapshot(&self, kind: SnapshotKind) -> Result<&Snapshot, RecoveryError> {
        self.point.snapshot(kind).ok_or_else(|| {
            RecoveryError::RestoreFailed(format!(
                "rollback point {} has no {kind} snapshot",
                self.point.id
            ))
        })
    }
}
