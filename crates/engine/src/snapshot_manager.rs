// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot capture, restore and validation.
//!
//! Each kind is backed by a different collaborator:
//!
//! - data store: the data platform's dump/restore
//! - configuration: verbatim file contents in the artifact store
//! - application code: a revision reference in version control
//!
//! Every capture produces a fresh artifact. Restores are all-or-nothing from
//! the caller's point of view: any error is a failed restore.

use crate::error::SnapshotError;
use rb_adapters::{operations, DataPlatform, OperationRequest, ProcessShell, VersionControl};
use rb_core::{Clock, EnvironmentConfig, RollbackPoint, Snapshot, SnapshotDetail, SnapshotKind};
use rb_storage::{sha256_hex, ArtifactError, ArtifactStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Collaborators the snapshot manager delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub data: Arc<dyn DataPlatform>,
    pub vcs: Arc<dyn VersionControl>,
    pub shell: Arc<dyn ProcessShell>,
}

/// Stored form of a configuration snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct ConfigBundle {
    files: Vec<ConfigFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    path: PathBuf,
    content: Vec<u8>,
}

pub struct SnapshotManager<C: Clock> {
    artifacts: ArtifactStore,
    deps: Collaborators,
    environments: BTreeMap<String, EnvironmentConfig>,
    timeout: Duration,
    clock: C,
}

impl<C: Clock> SnapshotManager<C> {
    pub fn new(
        artifacts: ArtifactStore,
        deps: Collaborators,
        environments: BTreeMap<String, EnvironmentConfig>,
        timeout: Duration,
        clock: C,
    ) -> Self {
        Self { artifacts, deps, environments, timeout, clock }
    }

    pub fn shell(&self) -> &Arc<dyn ProcessShell> {
        &self.deps.shell
    }

    /// Capture a fresh snapshot of `kind` for `environment`.
    pub async fn capture(
        &self,
        kind: SnapshotKind,
        environment: &str,
    ) -> Result<Snapshot, SnapshotError> {
        let fail = |reason: String| SnapshotError::CaptureFailed { kind, reason };
        let work = async {
            match kind {
                SnapshotKind::DataStore => self.capture_data(environment).await.map_err(fail),
                SnapshotKind::Configuration => self.capture_config(environment).await.map_err(fail),
                SnapshotKind::ApplicationCode => self.capture_code(environment).await.map_err(fail),
            }
        };
        let snapshot = self.bounded(kind, "capture", work).await?;
        tracing::info!(
            environment,
            %kind,
            locator = %snapshot.locator,
            size_bytes = snapshot.size_bytes,
            "captured snapshot"
        );
        Ok(snapshot)
    }

    /// Capture all kinds concurrently.
    ///
    /// If any capture fails, the artifacts of the others are discarded and
    /// the first failure in restore order is returned.
    pub async fn capture_all(
        &self,
        environment: &str,
    ) -> Result<BTreeMap<SnapshotKind, Snapshot>, SnapshotError> {
        let (data, config, code) = tokio::join!(
            self.capture(SnapshotKind::DataStore, environment),
            self.capture(SnapshotKind::Configuration, environment),
            self.capture(SnapshotKind::ApplicationCode, environment),
        );

        let mut captured = BTreeMap::new();
        let mut first_error = None;
        for result in [data, config, code] {
            match result {
                Ok(snapshot) => {
                    captured.insert(snapshot.kind, snapshot);
                }
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => tracing::warn!(environment, error = %e, "additional capture failure"),
            }
        }

        match first_error {
            None => Ok(captured),
            Some(e) => {
                for snapshot in captured.values() {
                    self.discard(snapshot).await;
                }
                Err(e)
            }
        }
    }

    /// Reverse a capture. Any partial progress counts as failure.
    pub async fn restore(
        &self,
        snapshot: &Snapshot,
        environment: &str,
    ) -> Result<(), SnapshotError> {
        let kind = snapshot.kind;
        let fail = |reason: String| SnapshotError::RestoreFailed { kind, reason };
        let work = async {
            match kind {
                SnapshotKind::DataStore => {
                    self.restore_data(snapshot, environment).await.map_err(fail)
                }
                SnapshotKind::Configuration => self.restore_config(snapshot).await.map_err(fail),
                SnapshotKind::ApplicationCode => {
                    self.restore_code(snapshot, environment).await.map_err(fail)
                }
            }
        };
        self.bounded(kind, "restore", work).await?;
        tracing::info!(environment, %kind, locator = %snapshot.locator, "restored snapshot");
        Ok(())
    }

    /// Whether `snapshot` can still be restored.
    pub async fn validate(&self, snapshot: &Snapshot, environment: &str) -> bool {
        self.check(snapshot, environment).await.is_ok()
    }

    /// Like [`SnapshotManager::validate`], with the reason it is unusable.
    pub async fn check(
        &self,
        snapshot: &Snapshot,
        environment: &str,
    ) -> Result<(), SnapshotError> {
        let kind = snapshot.kind;
        let invalid = |reason: String| SnapshotError::Invalid { kind, reason };
        if !snapshot.is_consistent() {
            return Err(invalid("detail does not match snapshot kind".to_string()));
        }
        let work = async {
            match kind {
                SnapshotKind::DataStore => self.check_data(snapshot).await.map_err(invalid),
                SnapshotKind::Configuration => self.check_config(snapshot).await.map_err(invalid),
                SnapshotKind::ApplicationCode => {
                    self.check_code(snapshot, environment).await.map_err(invalid)
                }
            }
        };
        self.bounded(kind, "validation", work).await
    }

    /// Remove the artifact behind `snapshot`. Best-effort.
    pub async fn discard(&self, snapshot: &Snapshot) {
        let result = match snapshot.kind {
            SnapshotKind::DataStore => {
                self.deps.data.discard(&snapshot.locator).await.map_err(|e| e.to_string())
            }
            SnapshotKind::Configuration => {
                let artifacts = self.artifacts.clone();
                let locator = snapshot.locator.clone();
                blocking(move || artifacts.remove(&locator)).await
            }
            SnapshotKind::ApplicationCode => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(
                kind = %snapshot.kind,
                locator = %snapshot.locator,
                error = %e,
                "failed to discard snapshot"
            );
        }
    }

    /// Discard every snapshot of `point`.
    pub async fn discard_point(&self, point: &RollbackPoint) {
        for snapshot in point.snapshots.values() {
            self.discard(snapshot).await;
        }
    }

    /// Check the artifact store accepts writes.
    pub async fn probe_storage(&self) -> Result<(), String> {
        let artifacts = self.artifacts.clone();
        blocking(move || artifacts.probe()).await
    }

    /// Compare live configuration files with the hashes recorded in `snapshot`.
    pub async fn verify_configuration(&self, snapshot: &Snapshot) -> Result<(), String> {
        let files = snapshot.configuration_files().ok_or("not a configuration snapshot")?;
        for (path, expected) in files {
            let content = tokio::fs::read(path)
                .await
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            if sha256_hex(&content) != *expected {
                return Err(format!("{} differs from the restored snapshot", path.display()));
            }
        }
        Ok(())
    }

    async fn bounded<T>(
        &self,
        kind: SnapshotKind,
        operation: &'static str,
        work: impl Future<Output = Result<T, SnapshotError>>,
    ) -> Result<T, SnapshotError> {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(SnapshotError::Timeout { kind, operation, after: self.timeout }),
        }
    }

    // ── data store ──────────────────────────────────────────────────────

    async fn capture_data(&self, environment: &str) -> Result<Snapshot, String> {
        let dump = self.deps.data.dump(environment).await.map_err(|e| e.to_string())?;
        Ok(Snapshot {
            kind: SnapshotKind::DataStore,
            locator: dump.locator,
            created_at_ms: self.clock.epoch_ms(),
            size_bytes: dump.size_bytes,
            checksum: Some(dump.checksum),
            detail: SnapshotDetail::DataStore,
        })
    }

    async fn restore_data(&self, snapshot: &Snapshot, environment: &str) -> Result<(), String> {
        self.check_data(snapshot).await?;
        self.deps.data.restore(environment, &snapshot.locator).await.map_err(|e| e.to_string())
    }

    async fn check_data(&self, snapshot: &Snapshot) -> Result<(), String> {
        let dump = self.deps.data.inspect(&snapshot.locator).await.map_err(|e| e.to_string())?;
        match &snapshot.checksum {
            Some(expected) if *expected != dump.checksum => {
                Err(format!("dump {} checksum mismatch", snapshot.locator))
            }
            _ => Ok(()),
        }
    }

    // ── configuration ───────────────────────────────────────────────────

    fn config_files(&self, environment: &str) -> Result<&[PathBuf], String> {
        self.environments
            .get(environment)
            .map(|env| env.config_files.as_slice())
            .ok_or_else(|| format!("unknown environment: {environment}"))
    }

    async fn capture_config(&self, environment: &str) -> Result<Snapshot, String> {
        let mut files = Vec::new();
        let mut hashes = BTreeMap::new();
        for path in self.config_files(environment)? {
            let content = tokio::fs::read(path)
                .await
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            hashes.insert(path.clone(), sha256_hex(&content));
            files.push(ConfigFile { path: path.clone(), content });
        }

        let bundle = serde_json::to_vec(&ConfigBundle { files }).map_err(|e| e.to_string())?;
        let artifacts = self.artifacts.clone();
        let stored = blocking(move || artifacts.put(&bundle)).await?;
        Ok(Snapshot {
            kind: SnapshotKind::Configuration,
            locator: stored.locator,
            created_at_ms: self.clock.epoch_ms(),
            size_bytes: stored.size_bytes,
            checksum: Some(stored.checksum),
            detail: SnapshotDetail::Configuration { files: hashes },
        })
    }

    async fn load_bundle(&self, snapshot: &Snapshot) -> Result<ConfigBundle, String> {
        let artifacts = self.artifacts.clone();
        let locator = snapshot.locator.clone();
        let checksum = snapshot.checksum.clone();
        let bytes = blocking(move || artifacts.get(&locator, checksum.as_deref())).await?;
        serde_json::from_slice(&bytes).map_err(|e| format!("corrupt configuration bundle: {e}"))
    }

    async fn restore_config(&self, snapshot: &Snapshot) -> Result<(), String> {
        let bundle = self.load_bundle(snapshot).await?;
        for file in &bundle.files {
            write_atomic(&file.path, &file.content)
                .await
                .map_err(|e| format!("cannot write {}: {}", file.path.display(), e))?;
        }
        Ok(())
    }

    async fn check_config(&self, snapshot: &Snapshot) -> Result<(), String> {
        let artifacts = self.artifacts.clone();
        let locator = snapshot.locator.clone();
        let checksum = snapshot.checksum.clone();
        blocking(move || {
            if !artifacts.exists(&locator) {
                return Err(ArtifactError::NotFound(locator).to_string());
            }
            match checksum {
                Some(checksum) if !artifacts.verify(&locator, &checksum) => {
                    Err(format!("artifact {locator} does not match checksum {checksum}"))
                }
                _ => Ok(()),
            }
        })
        .await?;

        for path in snapshot.configuration_files().into_iter().flat_map(|f| f.keys()) {
            let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(parent) = parent {
                if !tokio::fs::try_exists(parent).await.unwrap_or(false) {
                    return Err(format!("directory {} no longer exists", parent.display()));
                }
            }
        }
        Ok(())
    }

    // ── application code ────────────────────────────────────────────────

    async fn capture_code(&self, environment: &str) -> Result<Snapshot, String> {
        let revision =
            self.deps.vcs.current_revision(environment).await.map_err(|e| e.to_string())?;
        let release_version = self.release_version(environment).await?;
        Ok(Snapshot {
            kind: SnapshotKind::ApplicationCode,
            locator: format!("{}{}", Snapshot::VCS_LOCATOR_PREFIX, revision),
            created_at_ms: self.clock.epoch_ms(),
            size_bytes: 0,
            checksum: None,
            detail: SnapshotDetail::ApplicationCode { revision, release_version },
        })
    }

    /// Release version from the `release-version` operation, else `describe`.
    async fn release_version(&self, environment: &str) -> Result<String, String> {
        let request = OperationRequest::new(environment, operations::RELEASE_VERSION);
        match self.deps.shell.run(request).await {
            Ok(output) => {
                let version = output.into_result("release-version").map_err(|e| e.to_string())?;
                if !version.is_empty() {
                    return Ok(version);
                }
            }
            Err(e) if e.is_not_configured() => {}
            Err(e) => return Err(e.to_string()),
        }
        let version = self.deps.vcs.describe(environment).await.map_err(|e| e.to_string())?;
        if version.is_empty() {
            return Err("release version could not be determined".to_string());
        }
        Ok(version)
    }

    async fn restore_code(&self, snapshot: &Snapshot, environment: &str) -> Result<(), String> {
        let revision = snapshot.revision().ok_or("snapshot records no revision")?;
        self.deps.vcs.checkout(environment, revision).await.map_err(|e| e.to_string())?;

        let request = OperationRequest::new(environment, operations::INSTALL_DEPENDENCIES)
            .var("RB_REVISION", revision);
        match self.deps.shell.run(request).await {
            Ok(output) => {
                output.into_result("install-dependencies").map_err(|e| e.to_string())?;
                Ok(())
            }
            Err(e) if e.is_not_configured() => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn check_code(&self, snapshot: &Snapshot, environment: &str) -> Result<(), String> {
        let revision = snapshot.revision().ok_or("snapshot records no revision")?;
        let resolves =
            self.deps.vcs.resolves(environment, revision).await.map_err(|e| e.to_string())?;
        if resolves {
            Ok(())
        } else {
            Err(format!("revision {revision} does not resolve"))
        }
    }
}

/// Run a blocking artifact-store call off the async runtime.
async fn blocking<T, E>(f: impl FnOnce() -> Result<T, E> + Send + 'static) -> Result<T, String>
where
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("artifact task failed: {e}")),
    }
}

/// Replace `path` with `content` via a temp file in the same directory.
async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".rb-tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, content).await?;
    if let Ok(meta) = tokio::fs::metadata(path).await {
        tokio::fs::set_permissions(&tmp, meta.permissions()).await?;
    }
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
#[path = "snapshot_manager_tests.rs"]
mod tests;
