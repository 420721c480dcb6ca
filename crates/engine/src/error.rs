// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rb_adapters::AdapterError;
use rb_core::{InvalidTransition, SnapshotKind};
use rb_storage::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors from capturing, restoring or validating a single snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("capture of {kind} snapshot failed: {reason}")]
    CaptureFailed { kind: SnapshotKind, reason: String },
    #[error("restore of {kind} snapshot failed: {reason}")]
    RestoreFailed { kind: SnapshotKind, reason: String },
    #[error("{kind} snapshot is invalid: {reason}")]
    Invalid { kind: SnapshotKind, reason: String },
    #[error("{operation} of {kind} snapshot timed out after {}ms", .after.as_millis())]
    Timeout { kind: SnapshotKind, operation: &'static str, after: Duration },
}

impl SnapshotError {
    pub fn kind(&self) -> SnapshotKind {
        match self {
            SnapshotError::CaptureFailed { kind, .. }
            | SnapshotError::RestoreFailed { kind, .. }
            | SnapshotError::Invalid { kind, .. }
            | SnapshotError::Timeout { kind, .. } => *kind,
        }
    }
}

/// Errors surfaced by the recovery controller and its pipelines
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("rollback point not found: {0}")]
    NotFound(String),
    #[error(
        "rollback point {point_id} belongs to environment '{point_environment}', not '{requested}'"
    )]
    EnvironmentMismatch { point_id: String, point_environment: String, requested: String },
    #[error("a rollback execution is already in progress for '{0}'")]
    ExecutionInProgress(String),
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
    #[error("{0}")]
    CaptureFailed(String),
    #[error("{0}")]
    RestoreFailed(String),
    #[error("check `{check}` failed: {reason}")]
    ValidationFailed { check: String, reason: String },
    #[error("`{step}` timed out after {}ms", .after.as_millis())]
    Timeout { step: String, after: Duration },
    #[error("{operation}: {source}")]
    ExternalCollaborator {
        operation: String,
        #[source]
        source: AdapterError,
    },
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SnapshotError> for RecoveryError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::CaptureFailed { .. } => RecoveryError::CaptureFailed(e.to_string()),
            SnapshotError::RestoreFailed { .. } => RecoveryError::RestoreFailed(e.to_string()),
            SnapshotError::Invalid { kind, reason } => RecoveryError::ValidationFailed {
                check: format!("{kind}-snapshot"),
                reason,
            },
            SnapshotError::Timeout { kind, operation, after } => {
                RecoveryError::Timeout { step: format!("{operation} {kind}"), after }
            }
        }
    }
}
