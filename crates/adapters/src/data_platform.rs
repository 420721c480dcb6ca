// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-platform client: dumps and restores an environment's data store.

use crate::subprocess::{bash, check_success, run_with_timeout};
use crate::AdapterError;
use async_trait::async_trait;
use rb_core::id::ID_ALPHABET;
use rb_core::{Config, EnvironmentConfig};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// A data-store dump addressable by locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifact {
    pub locator: String,
    pub size_bytes: u64,
    /// SHA-256 of the dump content.
    pub checksum: String,
}

/// Dumps and restores environment data stores. Opaque to the orchestrator.
#[async_trait]
pub trait DataPlatform: Send + Sync {
    /// Produce a fresh dump of `environment`'s data store.
    async fn dump(&self, environment: &str) -> Result<DumpArtifact, AdapterError>;

    /// Restore `environment`'s data store from the dump at `locator`.
    async fn restore(&self, environment: &str, locator: &str) -> Result<(), AdapterError>;

    /// Describe the dump at `locator`, or [`AdapterError::NotFound`].
    async fn inspect(&self, locator: &str) -> Result<DumpArtifact, AdapterError>;

    /// Remove the dump at `locator`. Missing dumps are not an error.
    async fn discard(&self, locator: &str) -> Result<(), AdapterError>;
}

/// Data platform driven by the `data_dump` and `data_restore` commands.
///
/// Dumps live under `dumps_dir` as `<environment>-<id>.dump`; commands find
/// the dump path in `RB_DUMP_PATH`.
#[derive(Debug, Clone)]
pub struct CommandDataPlatform {
    dumps_dir: PathBuf,
    environments: BTreeMap<String, EnvironmentConfig>,
    timeout: Duration,
}

impl CommandDataPlatform {
    pub fn new(config: &Config, dumps_dir: impl Into<PathBuf>) -> Self {
        Self {
            dumps_dir: dumps_dir.into(),
            environments: config.environments.clone(),
            timeout: config.capture_timeout(),
        }
    }

    fn environment(&self, name: &str) -> Result<&EnvironmentConfig, AdapterError> {
        self.environments
            .get(name)
            .ok_or_else(|| AdapterError::UnknownEnvironment(name.to_string()))
    }

    fn path_for(&self, locator: &str) -> Result<PathBuf, AdapterError> {
        let valid = !locator.is_empty()
            && !locator.starts_with('.')
            && locator.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(AdapterError::InvalidLocator(locator.to_string()));
        }
        Ok(self.dumps_dir.join(locator))
    }

    async fn run(
        &self,
        script: &str,
        environment: &str,
        dump_path: &Path,
        description: &str,
    ) -> Result<(), AdapterError> {
        let mut cmd = bash(script);
        cmd.env("RB_ENVIRONMENT", environment).env("RB_DUMP_PATH", dump_path);
        if let Some(repo) = &self.environment(environment)?.repo {
            cmd.current_dir(repo);
        }
        let output = run_with_timeout(cmd, self.timeout, description).await?;
        check_success(&output, description)?;
        Ok(())
    }
}

#[async_trait]
impl DataPlatform for CommandDataPlatform {
    async fn dump(&self, environment: &str) -> Result<DumpArtifact, AdapterError> {
        let script = self.environment(environment)?.data_dump.as_deref().ok_or_else(|| {
            AdapterError::NotConfigured {
                environment: environment.to_string(),
                operation: "data_dump".to_string(),
            }
        })?;
        tokio::fs::create_dir_all(&self.dumps_dir).await?;
        let locator = format!("{}-{}.dump", environment, nanoid::nanoid!(12, &ID_ALPHABET));
        let path = self.path_for(&locator)?;

        tracing::info!(environment, %locator, "dumping data store");
        self.run(script, environment, &path, "data dump").await?;
        match self.inspect(&locator).await {
            Err(AdapterError::NotFound(_)) => Err(AdapterError::Failed(format!(
                "data dump command did not write {}",
                path.display()
            ))),
            other => other,
        }
    }

    async fn restore(&self, environment: &str, locator: &str) -> Result<(), AdapterError> {
        let script = self.environment(environment)?.data_restore.as_deref().ok_or_else(|| {
            AdapterError::NotConfigured {
                environment: environment.to_string(),
                operation: "data_restore".to_string(),
            }
        })?;
        let path = self.path_for(locator)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(AdapterError::NotFound(locator.to_string()));
        }
        tracing::info!(environment, locator, "restoring data store");
        self.run(script, environment, &path, "data restore").await
    }

    async fn inspect(&self, locator: &str) -> Result<DumpArtifact, AdapterError> {
        let path = self.path_for(locator)?;
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AdapterError::NotFound(locator.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut hasher = Sha256::new();
        let mut size_bytes = 0u64;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size_bytes += n as u64;
        }
        Ok(DumpArtifact {
            locator: locator.to_string(),
            size_bytes,
            checksum: format!("{:x}", hasher.finalize()),
        })
    }

    async fn discard(&self, locator: &str) -> Result<(), AdapterError> {
        let path = self.path_for(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{DataPlatform, DumpArtifact};
    use crate::AdapterError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sha2::{Digest, Sha256};
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Recorded data-platform call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DataCall {
        Dump { environment: String },
        Restore { environment: String, locator: String },
        Discard { locator: String },
    }

    #[derive(Default)]
    struct FakeDataState {
        calls: Vec<DataCall>,
        /// Live data-store content per environment.
        data: HashMap<String, String>,
        dumps: HashMap<String, String>,
        next_dump: u64,
        dump_failure: Option<String>,
        restore_failure: Option<String>,
        restore_failure_once: Option<String>,
    }

    /// In-memory data platform for testing.
    ///
    /// Each environment's data store is a string; dumps copy it and restores
    /// write it back.
    #[derive(Clone, Default)]
    pub struct FakeDataPlatform {
        inner: Arc<Mutex<FakeDataState>>,
    }

    fn artifact(locator: &str, content: &str) -> DumpArtifact {
        DumpArtifact {
            locator: locator.to_string(),
            size_bytes: content.len() as u64,
            checksum: format!("{:x}", Sha256::digest(content.as_bytes())),
        }
    }

    impl FakeDataPlatform {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded calls
        pub fn calls(&self) -> Vec<DataCall> {
            self.inner.lock().calls.clone()
        }

        /// Locators passed to `restore`, in order
        pub fn restored(&self) -> Vec<String> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|c| match c {
                    DataCall::Restore { locator, .. } => Some(locator.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn set_data(&self, environment: &str, content: &str) {
            self.inner.lock().data.insert(environment.to_string(), content.to_string());
        }

        pub fn data(&self, environment: &str) -> Option<String> {
            self.inner.lock().data.get(environment).cloned()
        }

        pub fn has_dump(&self, locator: &str) -> bool {
            self.inner.lock().dumps.contains_key(locator)
        }

        /// Delete a dump behind the orchestrator's back.
        pub fn lose_dump(&self, locator: &str) {
            self.inner.lock().dumps.remove(locator);
        }

        pub fn fail_dump(&self, message: &str) {
            self.inner.lock().dump_failure = Some(message.to_string());
        }

        /// Fail every subsequent restore.
        pub fn fail_restore(&self, message: &str) {
            self.inner.lock().restore_failure = Some(message.to_string());
        }

        /// Fail only the next restore.
        pub fn fail_restore_once(&self, message: &str) {
            self.inner.lock().restore_failure_once = Some(message.to_string());
        }
    }

    #[async_trait]
    impl DataPlatform for FakeDataPlatform {
        async fn dump(&self, environment: &str) -> Result<DumpArtifact, AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(DataCall::Dump { environment: environment.to_string() });
            if let Some(message) = &state.dump_failure {
                return Err(AdapterError::Failed(message.clone()));
            }
            state.next_dump += 1;
            let locator = format!("{}-{}.dump", environment, state.next_dump);
            let content = state.data.get(environment).cloned().unwrap_or_default();
            let dumped = artifact(&locator, &content);
            state.dumps.insert(locator, content);
            Ok(dumped)
        }

        async fn restore(&self, environment: &str, locator: &str) -> Result<(), AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(DataCall::Restore {
                environment: environment.to_string(),
                locator: locator.to_string(),
            });
            if let Some(message) = state.restore_failure_once.take() {
                return Err(AdapterError::Failed(message));
            }
            if let Some(message) = &state.restore_failure {
                return Err(AdapterError::Failed(message.clone()));
            }
            let content = state
                .dumps
                .get(locator)
                .cloned()
                .ok_or_else(|| AdapterError::NotFound(locator.to_string()))?;
            state.data.insert(environment.to_string(), content);
            Ok(())
        }

        async fn inspect(&self, locator: &str) -> Result<DumpArtifact, AdapterError> {
            let state = self.inner.lock();
            let content = state
                .dumps
                .get(locator)
                .ok_or_else(|| AdapterError::NotFound(locator.to_string()))?;
            Ok(artifact(locator, content))
        }

        async fn discard(&self, locator: &str) -> Result<(), AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(DataCall::Discard { locator: locator.to_string() });
            state.dumps.remove(locator);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DataCall, FakeDataPlatform};

#[cfg(test)]
#[path = "data_platform_tests.rs"]
mod tests;
