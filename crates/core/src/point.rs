// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback points: environment-scoped recovery targets.

use crate::snapshot::{Snapshot, SnapshotKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id! {
    /// Unique identifier for a rollback point.
    pub struct PointId("rbp-");
}

/// Metadata key holding the deployment marker re-applied during rollback.
pub const DEPLOYMENT_MARKER_KEY: &str = "deployment_marker";

/// Why a rollback point exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointPurpose {
    /// Created by an operator.
    #[default]
    Manual,
    /// Captured immediately before a rollback execution, for auto-restore.
    Safety,
}

crate::simple_display! {
    PointPurpose {
        Manual => "manual",
        Safety => "safety",
    }
}

/// A named, timestamped, environment-scoped recovery target.
///
/// Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackPoint {
    pub id: PointId,
    pub environment: String,
    pub created_at_ms: u64,
    pub created_by: String,
    pub release_version: String,
    pub source_revision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub purpose: PointPurpose,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub snapshots: BTreeMap<SnapshotKind, Snapshot>,
}

impl RollbackPoint {
    /// True when exactly one consistent snapshot exists for every supported kind.
    ///
    /// Incomplete points must never be selected for execution.
    pub fn is_complete(&self) -> bool {
        SnapshotKind::ALL.iter().all(|kind| {
            self.snapshots.get(kind).is_some_and(|s| s.kind == *kind && s.is_consistent())
        })
    }

    /// Kinds with no snapshot recorded.
    pub fn missing_kinds(&self) -> Vec<SnapshotKind> {
        SnapshotKind::ALL.into_iter().filter(|k| !self.snapshots.contains_key(k)).collect()
    }

    pub fn snapshot(&self, kind: SnapshotKind) -> Option<&Snapshot> {
        self.snapshots.get(&kind)
    }

    /// Deployment marker to re-apply when rolling back to this point.
    pub fn deployment_marker(&self) -> Option<&str> {
        self.metadata.get(DEPLOYMENT_MARKER_KEY).map(String::as_str)
    }

    /// Total bytes across all snapshots.
    pub fn total_size_bytes(&self) -> u64 {
        self.snapshots.values().map(|s| s.size_bytes).sum()
    }
}

crate::builder! {
    pub struct PointBuilder => RollbackPoint {
        into {
            id: PointId = PointId::new(),
            environment: String = "staging",
            created_by: String = "tester",
            release_version: String = "1.0.0",
            source_revision: String = "abc123",
        }
        set {
            created_at_ms: u64 = crate::FakeClock::START_MS,
            purpose: PointPurpose = PointPurpose::Manual,
            metadata: BTreeMap<String, String> = BTreeMap::new(),
            snapshots: BTreeMap<SnapshotKind, Snapshot> = crate::test_support::complete_snapshots(),
        }
        option {
            description: String = None,
        }
    }
}

#[cfg(test)]
#[path = "point_tests.rs"]
mod tests;
