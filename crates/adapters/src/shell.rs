// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-execution shell: runs named external operations per environment.

use crate::subprocess::{bash, run_with_timeout};
use crate::AdapterError;
use async_trait::async_trait;
use rb_core::{Config, EnvironmentConfig};
use std::collections::BTreeMap;
use std::time::Duration;

/// Operation names recognised in `[environments.<name>.operations]`.
pub mod operations {
    pub const ENVIRONMENT_PING: &str = "environment-ping";
    pub const DATA_STORE_PING: &str = "data-store-ping";
    pub const DATA_STORE_CONSISTENCY: &str = "data-store-consistency";
    pub const LIVENESS: &str = "liveness";
    pub const SMOKE_TEST: &str = "smoke-test";
    pub const STOP_SERVICES: &str = "stop-services";
    pub const RESUME_SERVICES: &str = "resume-services";
    pub const APPLY_MARKER: &str = "apply-marker";
    pub const INSTALL_DEPENDENCIES: &str = "install-dependencies";
    pub const RELEASE_VERSION: &str = "release-version";

    pub const ALL: [&str; 10] = [
        ENVIRONMENT_PING,
        DATA_STORE_PING,
        DATA_STORE_CONSISTENCY,
        LIVENESS,
        SMOKE_TEST,
        STOP_SERVICES,
        RESUME_SERVICES,
        APPLY_MARKER,
        INSTALL_DEPENDENCIES,
        RELEASE_VERSION,
    ];
}

/// A named operation to run against an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub environment: String,
    pub operation: String,
    /// Extra variables exported to the operation's process.
    pub vars: Vec<(String, String)>,
}

impl OperationRequest {
    pub fn new(environment: impl Into<String>, operation: impl Into<String>) -> Self {
        Self { environment: environment.into(), operation: operation.into(), vars: Vec::new() }
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    fn description(&self) -> String {
        format!("{} ({})", self.operation, self.environment)
    }
}

/// Exit status and captured output of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed stdout on success, [`AdapterError::CommandFailed`] otherwise.
    pub fn into_result(self, description: &str) -> Result<String, AdapterError> {
        if self.success() {
            return Ok(self.stdout.trim().to_string());
        }
        Err(AdapterError::CommandFailed {
            description: description.to_string(),
            code: self.exit_code,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Runs named external operations with captured exit status and output.
///
/// A non-zero exit is reported through [`ProcessOutput`], not as an error.
/// Operations absent from configuration yield [`AdapterError::NotConfigured`].
#[async_trait]
pub trait ProcessShell: Send + Sync {
    async fn run(&self, request: OperationRequest) -> Result<ProcessOutput, AdapterError>;
}

/// Shell that runs operations configured as `bash` one-liners.
///
/// Each operation sees `RB_ENVIRONMENT` and `RB_OPERATION`, runs in the
/// environment's `repo` when set, and is bounded by the step timeout.
#[derive(Debug, Clone)]
pub struct ConfigShell {
    environments: BTreeMap<String, EnvironmentConfig>,
    timeout: Duration,
}

impl ConfigShell {
    pub fn new(config: &Config) -> Self {
        Self { environments: config.environments.clone(), timeout: config.step_timeout() }
    }
}

#[async_trait]
impl ProcessShell for ConfigShell {
    async fn run(&self, request: OperationRequest) -> Result<ProcessOutput, AdapterError> {
        let env = self
            .environments
            .get(&request.environment)
            .ok_or_else(|| AdapterError::UnknownEnvironment(request.environment.clone()))?;
        let script = env.operation(&request.operation).ok_or_else(|| {
            AdapterError::NotConfigured {
                environment: request.environment.clone(),
                operation: request.operation.clone(),
            }
        })?;

        let mut cmd = bash(script);
        cmd.env("RB_ENVIRONMENT", &request.environment)
            .env("RB_OPERATION", &request.operation)
            .envs(request.vars.iter().map(|(k, v)| (k, v)));
        if let Some(repo) = &env.repo {
            cmd.current_dir(repo);
        }

        let description = request.description();
        tracing::info!(
            environment = %request.environment,
            operation = %request.operation,
            "running operation"
        );
        let output = run_with_timeout(cmd, self.timeout, &description).await?;
        let output = ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !output.success() {
            tracing::warn!(
                environment = %request.environment,
                operation = %request.operation,
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "operation failed"
            );
        }
        Ok(output)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{OperationRequest, ProcessOutput, ProcessShell};
    use crate::AdapterError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::{watch, Notify};

    /// Recorded operation invocation
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ShellCall {
        pub environment: String,
        pub operation: String,
        pub vars: Vec<(String, String)>,
    }

    struct Gate {
        open: watch::Sender<bool>,
        entered: Arc<Notify>,
    }

    #[derive(Default)]
    struct FakeShellState {
        calls: Vec<ShellCall>,
        outputs: HashMap<String, ProcessOutput>,
        unconfigured: HashSet<String>,
        gates: HashMap<String, Gate>,
    }

    /// Fake shell for testing.
    ///
    /// Every operation succeeds with empty output unless told otherwise.
    #[derive(Clone, Default)]
    pub struct FakeShell {
        inner: Arc<Mutex<FakeShellState>>,
    }

    impl FakeShell {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded invocations
        pub fn calls(&self) -> Vec<ShellCall> {
            self.inner.lock().calls.clone()
        }

        /// Names of invoked operations, in order
        pub fn operations(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|c| c.operation.clone()).collect()
        }

        /// Make `operation` succeed with `stdout`.
        pub fn set_stdout(&self, operation: &str, stdout: &str) {
            self.inner.lock().outputs.insert(
                operation.to_string(),
                ProcessOutput { exit_code: 0, stdout: stdout.to_string(), stderr: String::new() },
            );
        }

        /// Make `operation` exit 1 with `stderr`.
        pub fn fail(&self, operation: &str, stderr: &str) {
            self.inner.lock().outputs.insert(
                operation.to_string(),
                ProcessOutput { exit_code: 1, stdout: String::new(), stderr: stderr.to_string() },
            );
        }

        /// Treat `operation` as absent from configuration.
        pub fn unconfigure(&self, operation: &str) {
            self.inner.lock().unconfigured.insert(operation.to_string());
        }

        /// Block `operation` until [`FakeShell::release`] is called.
        pub fn hold(&self, operation: &str) {
            let (open, _) = watch::channel(false);
            self.inner
                .lock()
                .gates
                .insert(operation.to_string(), Gate { open, entered: Arc::new(Notify::new()) });
        }

        pub fn release(&self, operation: &str) {
            if let Some(gate) = self.inner.lock().gates.get(operation) {
                gate.open.send_replace(true);
            }
        }

        /// Wait until a held `operation` has been entered.
        pub async fn entered(&self, operation: &str) {
            let entered = self.inner.lock().gates.get(operation).map(|g| Arc::clone(&g.entered));
            if let Some(entered) = entered {
                entered.notified().await;
            }
        }
    }

    #[async_trait]
    impl ProcessShell for FakeShell {
        async fn run(&self, request: OperationRequest) -> Result<ProcessOutput, AdapterError> {
            let gate = {
                let mut state = self.inner.lock();
                state.calls.push(ShellCall {
                    environment: request.environment.clone(),
                    operation: request.operation.clone(),
                    vars: request.vars.clone(),
                });
                state
                    .gates
                    .get(&request.operation)
                    .map(|g| (g.open.subscribe(), Arc::clone(&g.entered)))
            };
            if let Some((mut open, entered)) = gate {
                entered.notify_one();
                let _ = open.wait_for(|open| *open).await;
            }

            let state = self.inner.lock();
            if state.unconfigured.contains(&request.operation) {
                return Err(AdapterError::NotConfigured {
                    environment: request.environment,
                    operation: request.operation,
                });
            }
            Ok(state.outputs.get(&request.operation).cloned().unwrap_or_default())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeShell, ShellCall};

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
