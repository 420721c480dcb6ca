// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-core: Core types for the rollback orchestrator (rb)

pub mod macros;

pub mod clock;
pub mod config;
pub mod execution;
pub mod id;
pub mod point;
pub mod snapshot;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[doc(hidden)]
pub mod __private {
    pub use smol_str::SmolStr;
}

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, EnvironmentConfig, RetentionConfig};
pub use execution::{
    ExecutionId, ExecutionStatus, ExecutionStep, FailureCause, InvalidTransition, Phase,
    RestoreAttempt, RollbackExecution, StepStatus,
};
pub use id::short;
pub use point::{PointId, PointPurpose, RollbackPoint, DEPLOYMENT_MARKER_KEY};
pub use snapshot::{Snapshot, SnapshotDetail, SnapshotKind};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
