// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Rollback orchestration engine.
//!
//! - [`SnapshotManager`]: capture, restore and validate snapshots
//! - [`Pipeline`]: generic fail-fast runner for checks and steps
//! - [`validation`] / [`execution`]: the standard check and step lists
//! - [`RecoveryController`]: drives a rollback end to end

mod context;
pub mod controller;
mod error;
pub mod events;
pub mod execution;
mod lock;
pub mod pipeline;
mod snapshot_manager;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{RollbackContext, SKIPPED};
pub use controller::{
    ControllerDeps, KindValidity, PointRequest, PointValidation, RecoveryController,
    RollbackOptions, PERSIST_EXECUTION, SAFETY_SNAPSHOT,
};
pub use error::{RecoveryError, SnapshotError};
pub use events::{EventSink, RollbackEvent};
pub use lock::{EnvironmentGuard, EnvironmentLocks};
pub use pipeline::{PhaseReport, Pipeline, StepFailure, StepResult, StepRunner};
pub use snapshot_manager::{Collaborators, SnapshotManager};
