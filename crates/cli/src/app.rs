// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring of the real collaborators and stores under the state directory.
//!
//! ```text
//! <state_dir>/
//!   catalog/<environment>.json
//!   artifacts/<locator>.zst
//!   dumps/<environment>-<id>.dump
//!   locks/<environment>.lock
//!   logs/rb.log
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use rb_adapters::{CommandDataPlatform, ConfigShell, GitVersionControl};
use rb_core::{Config, SystemClock};
use rb_engine::{Collaborators, ControllerDeps, EnvironmentLocks, RecoveryController};
use rb_storage::{ArtifactStore, PointStore};

pub struct App {
    config: Config,
    state_dir: PathBuf,
    store: Arc<PointStore>,
    artifacts: ArtifactStore,
}

impl App {
    pub fn open(config: Config, state_dir: PathBuf) -> Result<Self> {
        let store = PointStore::open(state_dir.join("catalog"), config.retention)?;
        let artifacts = ArtifactStore::open(state_dir.join("artifacts"))?;
        Ok(Self { config, state_dir, store: Arc::new(store), artifacts })
    }

    pub fn store(&self) -> &PointStore {
        &self.store
    }

    pub fn controller(&self) -> RecoveryController<SystemClock> {
        let collaborators = Collaborators {
            data: Arc::new(CommandDataPlatform::new(&self.config, self.state_dir.join("dumps"))),
            vcs: Arc::new(GitVersionControl::new(&self.config)),
            shell: Arc::new(ConfigShell::new(&self.config)),
        };
        let deps = ControllerDeps {
            store: Arc::clone(&self.store),
            artifacts: self.artifacts.clone(),
            collaborators,
            locks: EnvironmentLocks::new(self.state_dir.join("locks")),
        };
        RecoveryController::new(&self.config, deps, SystemClock)
    }
}
