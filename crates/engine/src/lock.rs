// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-scoped execution locks.
//!
//! An in-process set serializes rollbacks within one controller; an exclusive
//! `fs2` lock on `<locks>/<environment>.lock` serializes them across
//! processes sharing a state directory.

use crate::RecoveryError;
use fs2::FileExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EnvironmentLocks {
    dir: PathBuf,
    held: Arc<Mutex<HashSet<String>>>,
}

/// Held while an environment is being mutated. Released on drop.
#[derive(Debug)]
pub struct EnvironmentGuard {
    environment: String,
    held: Arc<Mutex<HashSet<String>>>,
    file: File,
}

impl EnvironmentLocks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), held: Arc::new(Mutex::new(HashSet::new())) }
    }

    /// Acquire `environment` without waiting.
    ///
    /// Fails with [`RecoveryError::ExecutionInProgress`] if another holder
    /// exists in this or any other process.
    pub fn acquire(&self, environment: &str) -> Result<EnvironmentGuard, RecoveryError> {
        if !self.held.lock().insert(environment.to_string()) {
            return Err(RecoveryError::ExecutionInProgress(environment.to_string()));
        }
        match self.lock_file(environment) {
            Ok(file) => Ok(EnvironmentGuard {
                environment: environment.to_string(),
                held: Arc::clone(&self.held),
                file,
            }),
            Err(e) => {
                self.held.lock().remove(environment);
                Err(e)
            }
        }
    }

    pub fn is_held(&self, environment: &str) -> bool {
        self.held.lock().contains(environment)
    }

    fn lock_file(&self, environment: &str) -> Result<File, RecoveryError> {
        std::fs::create_dir_all(&self.dir)?;
        // Don't truncate before holding the lock: the PID belongs to the holder.
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(format!("{environment}.lock")))?;
        if file.try_lock_exclusive().is_err() {
            return Err(RecoveryError::ExecutionInProgress(environment.to_string()));
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(file)
    }
}

impl EnvironmentGuard {
    pub fn environment(&self) -> &str {
        &self.environment
    }
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        self.held.lock().remove(&self.environment);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
