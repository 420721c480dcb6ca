// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery controller: the top-level rollback coordinator.
//!
//! Flow of [`RecoveryController::request_rollback`]:
//!
//! 1. Resolve the target point and take the environment lock.
//! 2. `validating`: pre-checks. Failure ends the execution untouched.
//! 3. Capture a safety point of the current environment (fail closed).
//! 4. `executing`: restore steps against the target.
//! 5. `post_validating`: post-checks.
//!
//! A failure in 4 or 5 records the root cause, then (if enabled) restores the
//! safety point kind by kind. Auto-restore outcomes are recorded separately
//! and never replace the root cause. A store write failure in 4 or 5 is
//! handled the same way, as a failed `persist-execution` step.
//!
//! The store is reloaded from disk after the environment lock is taken, so
//! records written by other processes are never overwritten.

use crate::context::RollbackContext;
use crate::events::{EventSink, RollbackEvent};
use crate::lock::EnvironmentLocks;
use crate::pipeline::{PhaseReport, StepFailure, StepRunner};
use crate::snapshot_manager::{Collaborators, SnapshotManager};
use crate::{execution, validation, RecoveryError};
use rb_core::{
    Clock, Config, ExecutionStatus, PointId, PointPurpose, RestoreAttempt, RollbackExecution,
    RollbackPoint, SnapshotKind, StepStatus, DEPLOYMENT_MARKER_KEY,
};
use rb_storage::{ArtifactStore, PointStore, StoreError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pseudo-step recorded when the safety point cannot be captured.
pub const SAFETY_SNAPSHOT: &str = "safety-snapshot";

/// Pseudo-step recorded when the execution record cannot be written.
pub const PERSIST_EXECUTION: &str = "persist-execution";

/// Metadata key linking a safety point to its execution.
pub const SAFETY_EXECUTION_KEY: &str = "execution_id";

/// Everything the controller needs from its assembler.
pub struct ControllerDeps {
    pub store: Arc<PointStore>,
    pub artifacts: ArtifactStore,
    pub collaborators: Collaborators,
    pub locks: EnvironmentLocks,
}

#[derive(Debug, Clone)]
pub struct RollbackOptions {
    /// Restore the safety point if execution or post-validation fails.
    pub auto_restore: bool,
    pub requested_by: String,
    /// Honoured between steps.
    pub cancel: CancellationToken,
}

impl Default for RollbackOptions {
    fn default() -> Self {
        Self {
            auto_restore: true,
            requested_by: "unknown".to_string(),
            cancel: CancellationToken::new(),
        }
    }
}

/// Parameters of a manually created rollback point.
#[derive(Debug, Clone, Default)]
pub struct PointRequest {
    pub environment: String,
    pub created_by: String,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl PointRequest {
    pub fn new(environment: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self { environment: environment.into(), created_by: created_by.into(), ..Self::default() }
    }

    rb_core::setters! {
        option {
            description: String,
        }
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Deployment marker re-applied when rolling back to this point.
    pub fn marker(self, marker: impl Into<String>) -> Self {
        self.meta(DEPLOYMENT_MARKER_KEY, marker)
    }
}

/// Validity of one snapshot kind of a point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindValidity {
    pub kind: SnapshotKind,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointValidation {
    pub point_id: PointId,
    pub environment: String,
    pub kinds: Vec<KindValidity>,
}

impl PointValidation {
    /// A point is usable only if every kind is present and valid.
    pub fn usable(&self) -> bool {
        self.kinds.len() == SnapshotKind::ALL.len() && self.kinds.iter().all(|k| k.valid)
    }
}

pub struct RecoveryController<C: Clock> {
    store: Arc<PointStore>,
    snapshots: Arc<SnapshotManager<C>>,
    environments: BTreeSet<String>,
    locks: EnvironmentLocks,
    step_timeout: Duration,
    restore_timeout: Duration,
    clock: C,
    events: EventSink,
}

impl<C: Clock> RecoveryController<C> {
    pub fn new(config: &Config, deps: ControllerDeps, clock: C) -> Self {
        let snapshots = SnapshotManager::new(
            deps.artifacts,
            deps.collaborators,
            config.environments.clone(),
            config.capture_timeout(),
            clock.clone(),
        );
        Self {
            store: deps.store,
            snapshots: Arc::new(snapshots),
            environments: config.environments.keys().cloned().collect(),
            locks: deps.locks,
            step_timeout: config.step_timeout(),
            restore_timeout: config.capture_timeout(),
            clock,
            events: EventSink::none(),
        }
    }

    /// Send progress events to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &Arc<PointStore> {
        &self.store
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager<C>> {
        &self.snapshots
    }

    fn ensure_environment(&self, environment: &str) -> Result<(), RecoveryError> {
        if self.environments.contains(environment) {
            Ok(())
        } else {
            Err(RecoveryError::UnknownEnvironment(environment.to_string()))
        }
    }

    /// Capture a complete rollback point of `request.environment`.
    pub async fn create_point(
        &self,
        request: PointRequest,
    ) -> Result<RollbackPoint, RecoveryError> {
        self.ensure_environment(&request.environment)?;
        let _guard = self.locks.acquire(&request.environment)?;
        self.store.refresh(&request.environment)?;
        self.capture_point(request, PointPurpose::Manual).await
    }

    async fn capture_point(
        &self,
        request: PointRequest,
        purpose: PointPurpose,
    ) -> Result<RollbackPoint, RecoveryError> {
        let environment = request.environment;
        let snapshots = self.snapshots.capture_all(&environment).await?;
        let (source_revision, release_version) = snapshots
            .get(&SnapshotKind::ApplicationCode)
            .and_then(|s| match &s.detail {
                rb_core::SnapshotDetail::ApplicationCode { revision, release_version } => {
                    Some((revision.clone(), release_version.clone()))
                }
                _ => None,
            })
            .ok_or_else(|| RecoveryError::CaptureFailed("no application-code snapshot".into()))?;

        let point = RollbackPoint {
            id: PointId::new(),
            environment: environment.clone(),
            created_at_ms: self.clock.epoch_ms(),
            created_by: request.created_by,
            release_version,
            source_revision,
            description: request.description,
            purpose,
            metadata: request.metadata,
            snapshots,
        };

        let evicted = match self.store.save_point(&point) {
            Ok(evicted) => evicted,
            Err(e) => {
                self.snapshots.discard_point(&point).await;
                return Err(e.into());
            }
        };
        tracing::info!(
            environment,
            point_id = %point.id,
            %purpose,
            release_version = %point.release_version,
            size_bytes = point.total_size_bytes(),
            "created rollback point"
        );
        for old in &evicted {
            self.snapshots.discard_point(old).await;
        }
        Ok(point)
    }

    /// Check every snapshot of a point without touching the environment.
    pub async fn validate_point(&self, point_id: &str) -> Result<PointValidation, RecoveryError> {
        let point = self.load_point(point_id)?;
        let mut kinds = Vec::new();
        for kind in SnapshotKind::ALL {
            let result = match point.snapshot(kind) {
                None => Err("snapshot missing".to_string()),
                Some(snapshot) => self
                    .snapshots
                    .check(snapshot, &point.environment)
                    .await
                    .map_err(|e| e.to_string()),
            };
            kinds.push(KindValidity { kind, valid: result.is_ok(), reason: result.err() });
        }
        Ok(PointValidation { point_id: point.id, environment: point.environment, kinds })
    }

    fn load_point(&self, point_id: &str) -> Result<RollbackPoint, RecoveryError> {
        match self.store.get_point(point_id) {
            Ok(point) => Ok(point),
            Err(StoreError::PointNotFound(id)) => Err(RecoveryError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Revert `environment` to the rollback point `point_id`.
    ///
    /// Returns `Err` only when the request is rejected before an execution
    /// exists (or the store fails). Every other outcome, including failure,
    /// is a terminal execution record.
    pub async fn request_rollback(
        &self,
        environment: &str,
        point_id: &str,
        options: RollbackOptions,
    ) -> Result<RollbackExecution, RecoveryError> {
        self.ensure_environment(environment)?;
        self.store.refresh(environment)?;
        let point = self.load_point(point_id)?;
        if point.environment != environment {
            return Err(RecoveryError::EnvironmentMismatch {
                point_id: point.id.to_string(),
                point_environment: point.environment,
                requested: environment.to_string(),
            });
        }

        let _guard = self.locks.acquire(environment)?;
        self.store.refresh(environment)?;
        self.reconcile(environment)?;

        let mut exec = RollbackExecution::new(
            point.id.clone(),
            environment,
            &options.requested_by,
            options.auto_restore,
            self.clock.epoch_ms(),
        );
        self.store.save_execution(&exec)?;
        tracing::info!(
            execution_id = %exec.id,
            environment,
            point_id = %point.id,
            requested_by = %exec.requested_by,
            auto_restore = exec.auto_restore,
            "rollback requested"
        );

        let execution_id = exec.id.clone();
        let runner = StepRunner {
            execution_id: &execution_id,
            clock: &self.clock,
            timeout: self.step_timeout,
            cancel: &options.cancel,
            events: &self.events,
        };
        let ctx = Arc::new(RollbackContext {
            environment: environment.to_string(),
            point,
            snapshots: Arc::clone(&self.snapshots),
        });

        // Pre-checks. Nothing has been touched yet.
        self.advance(&mut exec, ExecutionStatus::Validating).await?;
        let report = validation::pre_checks().run(Arc::clone(&ctx), &runner).await;
        if let Some(failure) = self.record(&mut exec, report)? {
            self.fail(&mut exec, failure).await?;
            return Ok(exec);
        }

        // Safety point of the current state.
        let safety = if options.cancel.is_cancelled() {
            Err(RecoveryError::Cancelled)
        } else {
            let request = PointRequest::new(environment, &options.requested_by)
                .description(format!("safety point before rollback {}", exec.id))
                .meta(SAFETY_EXECUTION_KEY, exec.id.to_string());
            self.capture_point(request, PointPurpose::Safety).await
        };
        match safety {
            Ok(safety) => {
                exec.safety_point_id = Some(safety.id.clone());
                self.store.save_execution(&exec)?;
                self.events
                    .emit(RollbackEvent::SafetyPointCaptured {
                        execution_id: exec.id.clone(),
                        point_id: safety.id,
                    })
                    .await;
            }
            Err(error) => {
                self.fail(&mut exec, StepFailure { step: SAFETY_SNAPSHOT.to_string(), error })
                    .await?;
                return Ok(exec);
            }
        }

        // Destructive phase. From here on a store failure counts as a failed
        // step, so the environment still gets its auto-restore.
        let phases = [
            (ExecutionStatus::Executing, execution::standard_steps(self.restore_timeout)),
            (ExecutionStatus::PostValidating, validation::post_checks()),
        ];
        for (status, pipeline) in phases {
            let failure = match self.advance_or_fail(&mut exec, status).await? {
                Some(failure) => Some(failure),
                None => {
                    let report = pipeline.run(Arc::clone(&ctx), &runner).await;
                    self.record_or_fail(&mut exec, report)
                }
            };
            if let Some(failure) = failure {
                self.fail_and_recover(&mut exec, failure).await?;
                return Ok(exec);
            }
        }

        // The environment is at the target; a failed final write is
        // reported without undoing it.
        self.advance(&mut exec, ExecutionStatus::Succeeded).await?;
        tracing::info!(execution_id = %exec.id, environment, "rollback succeeded");
        Ok(exec)
    }

    /// Fail any execution left non-terminal by a process that no longer runs it.
    fn reconcile(&self, environment: &str) -> Result<(), RecoveryError> {
        if let Some(mut stale) = self.store.active_execution(environment) {
            tracing::warn!(
                execution_id = %stale.id,
                environment,
                status = %stale.status,
                "marking interrupted execution as failed"
            );
            stale.mark_interrupted(self.clock.epoch_ms());
            self.store.save_execution(&stale)?;
        }
        Ok(())
    }

    async fn advance(
        &self,
        exec: &mut RollbackExecution,
        status: ExecutionStatus,
    ) -> Result<(), RecoveryError> {
        exec.transition(status, self.clock.epoch_ms())?;
        self.store.save_execution(exec)?;
        self.emit_status(exec).await;
        Ok(())
    }

    /// [`Self::advance`], turning a store failure into a step failure.
    async fn advance_or_fail(
        &self,
        exec: &mut RollbackExecution,
        status: ExecutionStatus,
    ) -> Result<Option<StepFailure>, RecoveryError> {
        exec.transition(status, self.clock.epoch_ms())?;
        let saved = self.store.save_execution(exec);
        self.emit_status(exec).await;
        Ok(saved.err().map(persist_failure))
    }

    async fn emit_status(&self, exec: &RollbackExecution) {
        self.events
            .emit(RollbackEvent::StatusChanged {
                execution_id: exec.id.clone(),
                environment: exec.environment.clone(),
                status: exec.status,
            })
            .await;
    }

    /// Append a phase's steps and persist them.
    fn record(
        &self,
        exec: &mut RollbackExecution,
        report: PhaseReport,
    ) -> Result<Option<StepFailure>, RecoveryError> {
        exec.steps.extend(report.steps);
        self.store.save_execution(exec)?;
        Ok(report.failure)
    }

    /// [`Self::record`], turning a store failure into a step failure.
    ///
    /// A step failure in the report stays the root cause.
    fn record_or_fail(
        &self,
        exec: &mut RollbackExecution,
        report: PhaseReport,
    ) -> Option<StepFailure> {
        exec.steps.extend(report.steps);
        match (self.store.save_execution(exec), report.failure) {
            (_, Some(failure)) => Some(failure),
            (Ok(()), None) => None,
            (Err(e), None) => Some(persist_failure(e)),
        }
    }

    async fn fail(
        &self,
        exec: &mut RollbackExecution,
        failure: StepFailure,
    ) -> Result<(), RecoveryError> {
        self.mark_failed(exec, failure)?;
        let saved = self.store.save_execution(exec);
        self.emit_status(exec).await;
        saved?;
        Ok(())
    }

    fn mark_failed(
        &self,
        exec: &mut RollbackExecution,
        failure: StepFailure,
    ) -> Result<(), RecoveryError> {
        tracing::error!(
            execution_id = %exec.id,
            environment = %exec.environment,
            phase = %exec.status,
            step = %failure.step,
            error = %failure.error,
            "rollback failed"
        );
        exec.fail(&failure.step, failure.error.to_string(), self.clock.epoch_ms())?;
        Ok(())
    }

    /// Record the root cause, then restore the safety point if enabled.
    ///
    /// The environment may already be changed, so auto-restore runs even when
    /// the failed record cannot be written. Only the final write is reported.
    async fn fail_and_recover(
        &self,
        exec: &mut RollbackExecution,
        failure: StepFailure,
    ) -> Result<(), RecoveryError> {
        self.mark_failed(exec, failure)?;
        if let Err(e) = self.store.save_execution(exec) {
            tracing::error!(execution_id = %exec.id, error = %e, "failed to persist failure");
        }
        self.emit_status(exec).await;

        if exec.auto_restore {
            self.auto_restore(exec).await;
        } else {
            tracing::warn!(
                execution_id = %exec.id,
                "auto-restore disabled, environment left as-is"
            );
        }
        self.store.save_execution(exec)?;
        Ok(())
    }

    async fn auto_restore(&self, exec: &mut RollbackExecution) {
        let Some(safety_id) = exec.safety_point_id.clone() else {
            return;
        };
        let safety = match self.store.get_point(&safety_id) {
            Ok(point) => point,
            Err(e) => {
                tracing::error!(execution_id = %exec.id, error = %e, "safety point unavailable");
                let error = format!("safety point unavailable: {e}");
                for kind in SnapshotKind::ALL {
                    let error = Some(error.clone());
                    exec.restore_attempts.push(RestoreAttempt {
                        kind,
                        status: StepStatus::Failed,
                        error,
                    });
                }
                return;
            }
        };

        self.events
            .emit(RollbackEvent::AutoRestoreStarted {
                execution_id: exec.id.clone(),
                safety_point_id: safety_id,
            })
            .await;
        for kind in SnapshotKind::ALL {
            let result = match safety.snapshot(kind) {
                Some(snapshot) => self
                    .snapshots
                    .restore(snapshot, &exec.environment)
                    .await
                    .map_err(|e| e.to_string()),
                None => Err(format!("safety point has no {kind} snapshot")),
            };
            let attempt = match result {
                Ok(()) => RestoreAttempt { kind, status: StepStatus::Success, error: None },
                Err(error) => {
                    RestoreAttempt { kind, status: StepStatus::Failed, error: Some(error) }
                }
            };
            exec.restore_attempts.push(attempt.clone());
            let event =
                RollbackEvent::AutoRestoreAttempted { execution_id: exec.id.clone(), attempt };
            self.events.emit(event).await;
        }
    }
}

fn persist_failure(error: StoreError) -> StepFailure {
    StepFailure { step: PERSIST_EXECUTION.to_string(), error: error.into() }
}

#[cfg(test)]
#[path = "controller_tests/mod.rs"]
mod tests;
