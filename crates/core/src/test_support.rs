// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::snapshot::{Snapshot, SnapshotDetail, SnapshotKind};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::execution::ExecutionStatus;
    use proptest::prelude::*;

    pub fn arb_status() -> impl Strategy<Value = ExecutionStatus> {
        prop_oneof![
            Just(ExecutionStatus::Pending),
            Just(ExecutionStatus::Validating),
            Just(ExecutionStatus::Executing),
            Just(ExecutionStatus::PostValidating),
            Just(ExecutionStatus::Succeeded),
            Just(ExecutionStatus::Failed),
        ]
    }
}

// ── Snapshot factories ──────────────────────────────────────────────────

pub fn data_snapshot() -> Snapshot {
    Snapshot {
        kind: SnapshotKind::DataStore,
        locator: "staging-1.dump".to_string(),
        created_at_ms: 1_000_000,
        size_bytes: 2048,
        checksum: None,
        detail: SnapshotDetail::DataStore,
    }
}

pub fn config_snapshot(files: &[(&str, &str)]) -> Snapshot {
    let files: BTreeMap<PathBuf, String> =
        files.iter().map(|(p, h)| (PathBuf::from(p), h.to_string())).collect();
    Snapshot {
        kind: SnapshotKind::Configuration,
        locator: "art-config".to_string(),
        created_at_ms: 1_000_000,
        size_bytes: 128,
        checksum: Some("cafebabe".to_string()),
        detail: SnapshotDetail::Configuration { files },
    }
}

pub fn app_code_snapshot(revision: &str) -> Snapshot {
    Snapshot {
        kind: SnapshotKind::ApplicationCode,
        locator: format!("{}{}", Snapshot::VCS_LOCATOR_PREFIX, revision),
        created_at_ms: 1_000_000,
        size_bytes: 0,
        checksum: None,
        detail: SnapshotDetail::ApplicationCode {
            revision: revision.to_string(),
            release_version: "1.0.0".to_string(),
        },
    }
}

/// One snapshot of every kind.
pub fn complete_snapshots() -> BTreeMap<SnapshotKind, Snapshot> {
    [
        data_snapshot(),
        config_snapshot(&[("/etc/app.toml", "deadbeef")]),
        app_code_snapshot("abc123"),
    ]
        .into_iter()
        .map(|s| (s.kind, s))
        .collect()
}
