// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured progress events for external observers.

use rb_core::{ExecutionId, ExecutionStatus, ExecutionStep, Phase, PointId, RestoreAttempt};
use serde::Serialize;
use tokio::sync::mpsc;

/// Progress of a rollback execution, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollbackEvent {
    StatusChanged { execution_id: ExecutionId, environment: String, status: ExecutionStatus },
    StepStarted { execution_id: ExecutionId, phase: Phase, step: String },
    StepFinished { execution_id: ExecutionId, step: ExecutionStep },
    SafetyPointCaptured { execution_id: ExecutionId, point_id: PointId },
    AutoRestoreStarted { execution_id: ExecutionId, safety_point_id: PointId },
    AutoRestoreAttempted { execution_id: ExecutionId, attempt: RestoreAttempt },
}

/// Optional channel to an event consumer.
///
/// A closed or absent receiver never affects the pipeline.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<RollbackEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<RollbackEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub async fn emit(&self, event: RollbackEvent) {
        match &event {
            RollbackEvent::StatusChanged { execution_id, environment, status } => {
                tracing::info!(%execution_id, environment, %status, "status changed");
            }
            RollbackEvent::StepStarted { execution_id, phase, step } => {
                tracing::info!(%execution_id, %phase, step, "step started");
            }
            RollbackEvent::StepFinished { execution_id, step } => {
                let elapsed_ms = step.elapsed_ms();
                match &step.error {
                    None => tracing::info!(
                        %execution_id,
                        step = %step.name,
                        elapsed_ms,
                        "step succeeded"
                    ),
                    Some(error) => tracing::warn!(
                        %execution_id,
                        step = %step.name,
                        elapsed_ms,
                        error = %error,
                        "step failed"
                    ),
                }
            }
            RollbackEvent::SafetyPointCaptured { execution_id, point_id } => {
                tracing::info!(%execution_id, %point_id, "safety point captured");
            }
            RollbackEvent::AutoRestoreStarted { execution_id, safety_point_id } => {
                tracing::warn!(%execution_id, %safety_point_id, "auto-restoring safety point");
            }
            RollbackEvent::AutoRestoreAttempted { execution_id, attempt } => match &attempt.error {
                None => {
                    tracing::info!(%execution_id, kind = %attempt.kind, "auto-restore succeeded")
                }
                Some(error) => tracing::error!(
                    %execution_id,
                    kind = %attempt.kind,
                    error = %error,
                    "auto-restore failed"
                ),
            },
        }

        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                tracing::debug!("event receiver dropped");
            }
        }
    }
}
