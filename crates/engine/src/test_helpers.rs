// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::context::RollbackContext;
use crate::{
    Collaborators, ControllerDeps, EnvironmentLocks, EventSink, PointRequest, RecoveryController,
    SnapshotManager, StepRunner,
};
use rb_adapters::{FakeDataPlatform, FakeShell, FakeVersionControl};
use rb_core::{Config, EnvironmentConfig, ExecutionId, FakeClock, RetentionConfig, RollbackPoint};
use rb_storage::{ArtifactStore, PointStore};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub(crate) const ENVIRONMENTS: [&str; 2] = ["staging", "production"];

/// Temp state directory, fake collaborators and a store.
pub(crate) struct TestContext {
    pub dir: TempDir,
    pub config: Config,
    pub clock: FakeClock,
    pub data: FakeDataPlatform,
    pub vcs: FakeVersionControl,
    pub shell: FakeShell,
    pub store: Arc<PointStore>,
    pub artifacts: ArtifactStore,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_retention(RetentionConfig::default())
    }

    pub fn with_retention(retention: RetentionConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut environments = BTreeMap::new();
        for env in ENVIRONMENTS {
            let config_file = dir.path().join(env).join("app.toml");
            std::fs::create_dir_all(config_file.parent().unwrap()).unwrap();
            std::fs::write(&config_file, format!("release = \"v1\"\nenv = \"{env}\"\n")).unwrap();
            environments.insert(
                env.to_string(),
                EnvironmentConfig { config_files: vec![config_file], ..Default::default() },
            );
        }
        let config = Config {
            state_dir: Some(dir.path().to_path_buf()),
            step_timeout_ms: 5_000,
            capture_timeout_ms: 5_000,
            retention,
            environments,
        };
        let store = Arc::new(PointStore::open(dir.path().join("catalog"), retention).unwrap());
        let artifacts = ArtifactStore::open(dir.path().join("artifacts")).unwrap();

        let data = FakeDataPlatform::new();
        for env in ENVIRONMENTS {
            data.set_data(env, "rows=v1");
        }
        Self {
            dir,
            config,
            clock: FakeClock::new(),
            data,
            vcs: FakeVersionControl::new(),
            shell: FakeShell::new(),
            store,
            artifacts,
        }
    }

    pub fn config_file(&self, env: &str) -> PathBuf {
        self.dir.path().join(env).join("app.toml")
    }

    pub fn write_config(&self, env: &str, content: &str) {
        std::fs::write(self.config_file(env), content).unwrap();
    }

    pub fn read_config(&self, env: &str) -> String {
        std::fs::read_to_string(self.config_file(env)).unwrap()
    }

    /// Simulate a deployment that changed every kind of state.
    pub fn deploy(&self, env: &str, version: &str) {
        self.data.set_data(env, &format!("rows={version}"));
        self.write_config(env, &format!("release = \"{version}\"\n"));
        self.vcs.set_revision(env, &format!("rev-{version}"));
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            data: Arc::new(self.data.clone()),
            vcs: Arc::new(self.vcs.clone()),
            shell: Arc::new(self.shell.clone()),
        }
    }

    pub fn snapshot_manager(&self, timeout: Duration) -> SnapshotManager<FakeClock> {
        SnapshotManager::new(
            self.artifacts.clone(),
            self.collaborators(),
            self.config.environments.clone(),
            timeout,
            self.clock.clone(),
        )
    }

    /// A controller over this context. Controllers built from the same
    /// context share the store and the lock directory, like two processes.
    pub fn controller(&self) -> RecoveryController<FakeClock> {
        self.controller_on(Arc::clone(&self.store))
    }

    /// A controller over this context with its own `store`.
    pub fn controller_on(&self, store: Arc<PointStore>) -> RecoveryController<FakeClock> {
        RecoveryController::new(
            &self.config,
            ControllerDeps {
                store,
                artifacts: self.artifacts.clone(),
                collaborators: self.collaborators(),
                locks: EnvironmentLocks::new(self.dir.path().join("locks")),
            },
            self.clock.clone(),
        )
    }

    /// Open another store over the same catalog directory, as a second
    /// process would.
    pub fn open_store(&self) -> Arc<PointStore> {
        let root = self.dir.path().join("catalog");
        Arc::new(PointStore::open(root, self.config.retention).unwrap())
    }

    pub fn catalog_file(&self, env: &str) -> PathBuf {
        self.dir.path().join("catalog").join(format!("{env}.json"))
    }

    /// Capture a manual point of `env` in its current state.
    pub async fn create_point(&self, env: &str) -> RollbackPoint {
        self.controller().create_point(PointRequest::new(env, "tester")).await.unwrap()
    }

    /// Context for checks and steps that target `point`.
    pub fn rollback_context(&self, point: RollbackPoint) -> Arc<RollbackContext<FakeClock>> {
        Arc::new(RollbackContext {
            environment: point.environment.clone(),
            point,
            snapshots: Arc::new(self.snapshot_manager(Duration::from_secs(5))),
        })
    }

    /// Number of configuration artifacts on disk.
    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(self.artifacts.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "zst"))
            .count()
    }
}

/// Owned parts of a [`StepRunner`].
pub(crate) struct RunnerParts {
    pub id: ExecutionId,
    pub clock: FakeClock,
    pub cancel: CancellationToken,
    pub events: EventSink,
}

impl RunnerParts {
    pub fn new(clock: &FakeClock) -> Self {
        Self {
            id: ExecutionId::new(),
            clock: clock.clone(),
            cancel: CancellationToken::new(),
            events: EventSink::none(),
        }
    }

    pub fn runner(&self) -> StepRunner<'_, FakeClock> {
        StepRunner {
            execution_id: &self.id,
            clock: &self.clock,
            timeout: Duration::from_secs(5),
            cancel: &self.cancel,
            events: &self.events,
        }
    }
}

/// Drive `future` on a fresh current-thread runtime, for parameterized tests.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(future)
}
