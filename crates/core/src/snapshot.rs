// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot kinds and captured artifact descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The kinds of state a rollback point captures.
///
/// Declaration order is the restore order used by the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotKind {
    DataStore,
    Configuration,
    ApplicationCode,
}

impl SnapshotKind {
    /// Every supported kind, in restore order.
    pub const ALL: [SnapshotKind; 3] =
        [SnapshotKind::DataStore, SnapshotKind::Configuration, SnapshotKind::ApplicationCode];
}

crate::simple_display! {
    SnapshotKind {
        DataStore => "data-store",
        Configuration => "configuration",
        ApplicationCode => "application-code",
    }
}

/// Kind-specific descriptive fields of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SnapshotDetail {
    /// Dump produced by the data platform.
    DataStore,
    /// Verbatim copies of the enumerated configuration files.
    ///
    /// Maps each captured path to the SHA-256 of its content at capture time.
    Configuration { files: BTreeMap<PathBuf, String> },
    /// Source revision reference; no bytes are copied.
    ApplicationCode { revision: String, release_version: String },
}

/// One opaque captured artifact.
///
/// Immutable once captured and owned by exactly one rollback point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    /// Storage locator. Artifact id for configuration, dump locator for the
    /// data store, `vcs:<revision>` for application code.
    pub locator: String,
    pub created_at_ms: u64,
    pub size_bytes: u64,
    /// SHA-256 of the artifact content, when there is content to hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub detail: SnapshotDetail,
}

impl Snapshot {
    /// Locator prefix used for application-code references.
    pub const VCS_LOCATOR_PREFIX: &'static str = "vcs:";

    /// The revision recorded by an application-code snapshot.
    pub fn revision(&self) -> Option<&str> {
        match &self.detail {
            SnapshotDetail::ApplicationCode { revision, .. } => Some(revision),
            _ => None,
        }
    }

    /// Captured configuration files and their content hashes.
    pub fn configuration_files(&self) -> Option<&BTreeMap<PathBuf, String>> {
        match &self.detail {
            SnapshotDetail::Configuration { files } => Some(files),
            _ => None,
        }
    }

    /// True when the detail variant agrees with `kind`.
    pub fn is_consistent(&self) -> bool {
        matches!(
            (self.kind, &self.detail),
            (SnapshotKind::DataStore, SnapshotDetail::DataStore)
                | (SnapshotKind::Configuration, SnapshotDetail::Configuration { .. })
                | (SnapshotKind::ApplicationCode, SnapshotDetail::ApplicationCode { .. })
        )
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
