// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the external collaborators of the rollback orchestrator

pub mod data_platform;
mod error;
pub mod shell;
pub mod subprocess;
pub mod vcs;

pub use data_platform::{CommandDataPlatform, DataPlatform, DumpArtifact};
pub use error::AdapterError;
pub use shell::{operations, ConfigShell, OperationRequest, ProcessOutput, ProcessShell};
pub use vcs::{GitVersionControl, VersionControl};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use data_platform::{DataCall, FakeDataPlatform};
#[cfg(any(test, feature = "test-support"))]
pub use shell::{FakeShell, ShellCall};
#[cfg(any(test, feature = "test-support"))]
pub use vcs::{FakeVersionControl, VcsCall};
