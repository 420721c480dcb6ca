// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version-control client for an environment's working tree.

use crate::subprocess::{check_success, run_with_timeout};
use crate::AdapterError;
use async_trait::async_trait;
use rb_core::{Config, EnvironmentConfig};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Reads and moves the deployed source revision of an environment.
#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn current_revision(&self, environment: &str) -> Result<String, AdapterError>;

    async fn checkout(&self, environment: &str, revision: &str) -> Result<(), AdapterError>;

    /// Whether `revision` names a commit available to `environment`.
    async fn resolves(&self, environment: &str, revision: &str) -> Result<bool, AdapterError>;

    /// Human-readable version of the current revision (e.g. nearest tag).
    async fn describe(&self, environment: &str) -> Result<String, AdapterError>;
}

/// Git client operating on each environment's `repo`.
#[derive(Debug, Clone)]
pub struct GitVersionControl {
    environments: BTreeMap<String, EnvironmentConfig>,
    timeout: Duration,
}

impl GitVersionControl {
    pub fn new(config: &Config) -> Self {
        Self { environments: config.environments.clone(), timeout: config.step_timeout() }
    }

    fn repo(&self, environment: &str) -> Result<&Path, AdapterError> {
        let env = self
            .environments
            .get(environment)
            .ok_or_else(|| AdapterError::UnknownEnvironment(environment.to_string()))?;
        env.repo.as_deref().ok_or_else(|| AdapterError::NotConfigured {
            environment: environment.to_string(),
            operation: "repo".to_string(),
        })
    }

    fn git(repo: &Path, args: &[&str]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("git");
        cmd.arg("-C").arg(repo).args(args).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
        cmd
    }

    async fn run(
        &self,
        environment: &str,
        args: &[&str],
        description: &str,
    ) -> Result<String, AdapterError> {
        let cmd = Self::git(self.repo(environment)?, args);
        let output = run_with_timeout(cmd, self.timeout, description).await?;
        check_success(&output, description)
    }
}

#[async_trait]
impl VersionControl for GitVersionControl {
    async fn current_revision(&self, environment: &str) -> Result<String, AdapterError> {
        self.run(environment, &["rev-parse", "HEAD"], "git rev-parse").await
    }

    async fn checkout(&self, environment: &str, revision: &str) -> Result<(), AdapterError> {
        tracing::info!(environment, revision, "checking out revision");
        let args = ["checkout", "--force", "--detach", revision];
        self.run(environment, &args, "git checkout").await?;
        Ok(())
    }

    async fn resolves(&self, environment: &str, revision: &str) -> Result<bool, AdapterError> {
        let object = format!("{revision}^{{commit}}");
        let cmd = Self::git(self.repo(environment)?, &["cat-file", "-e", &object]);
        let output = run_with_timeout(cmd, self.timeout, "git cat-file").await?;
        Ok(output.status.success())
    }

    async fn describe(&self, environment: &str) -> Result<String, AdapterError> {
        self.run(environment, &["describe", "--tags", "--always"], "git describe").await
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::VersionControl;
    use crate::AdapterError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    /// Revision reported for environments without an explicit one.
    const DEFAULT_REVISION: &str = "abc123";

    /// Recorded version-control call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum VcsCall {
        CurrentRevision { environment: String },
        Checkout { environment: String, revision: String },
    }

    #[derive(Default)]
    struct FakeVcsState {
        calls: Vec<VcsCall>,
        revisions: HashMap<String, String>,
        versions: HashMap<String, String>,
        unknown: HashSet<String>,
        checkout_failure: Option<String>,
        revision_failure: Option<String>,
    }

    /// Fake version control for testing.
    #[derive(Clone, Default)]
    pub struct FakeVersionControl {
        inner: Arc<Mutex<FakeVcsState>>,
    }

    impl FakeVersionControl {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded calls
        pub fn calls(&self) -> Vec<VcsCall> {
            self.inner.lock().calls.clone()
        }

        /// Revisions passed to `checkout`, in order
        pub fn checkouts(&self) -> Vec<String> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|c| match c {
                    VcsCall::Checkout { revision, .. } => Some(revision.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn set_revision(&self, environment: &str, revision: &str) {
            self.inner.lock().revisions.insert(environment.to_string(), revision.to_string());
        }

        pub fn revision(&self, environment: &str) -> String {
            let state = self.inner.lock();
            state.revisions.get(environment).cloned().unwrap_or_else(|| DEFAULT_REVISION.into())
        }

        pub fn set_version(&self, environment: &str, version: &str) {
            self.inner.lock().versions.insert(environment.to_string(), version.to_string());
        }

        /// Make `revision` unresolvable.
        pub fn forget(&self, revision: &str) {
            self.inner.lock().unknown.insert(revision.to_string());
        }

        pub fn fail_checkout(&self, message: &str) {
            self.inner.lock().checkout_failure = Some(message.to_string());
        }

        pub fn fail_current_revision(&self, message: &str) {
            self.inner.lock().revision_failure = Some(message.to_string());
        }
    }

    #[async_trait]
    impl VersionControl for FakeVersionControl {
        async fn current_revision(&self, environment: &str) -> Result<String, AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(VcsCall::CurrentRevision { environment: environment.to_string() });
            if let Some(message) = &state.revision_failure {
                return Err(AdapterError::Failed(message.clone()));
            }
            let revision = state.revisions.get(environment).cloned();
            Ok(revision.unwrap_or_else(|| DEFAULT_REVISION.into()))
        }

        async fn checkout(&self, environment: &str, revision: &str) -> Result<(), AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(VcsCall::Checkout {
                environment: environment.to_string(),
                revision: revision.to_string(),
            });
            if let Some(message) = &state.checkout_failure {
                return Err(AdapterError::Failed(message.clone()));
            }
            if state.unknown.contains(revision) {
                return Err(AdapterError::Failed(format!("unknown revision {revision}")));
            }
            state.revisions.insert(environment.to_string(), revision.to_string());
            Ok(())
        }

        async fn resolves(&self, _environment: &str, revision: &str) -> Result<bool, AdapterError> {
            Ok(!self.inner.lock().unknown.contains(revision))
        }

        async fn describe(&self, environment: &str) -> Result<String, AdapterError> {
            let state = self.inner.lock();
            Ok(state.versions.get(environment).cloned().unwrap_or_else(|| "v1.0.0".to_string()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeVersionControl, VcsCall};

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
