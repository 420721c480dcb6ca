// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded subprocess execution.

use crate::AdapterError;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Default bound for commands whose caller does not supply one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// Stdout and stderr are captured; stdin is closed.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, AdapterError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    let child = cmd
        .spawn()
        .map_err(|source| AdapterError::Spawn { description: description.to_string(), source })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AdapterError::Io(e)),
        Err(_) => {
            tracing::warn!(
                description,
                timeout_ms = timeout.as_millis() as u64,
                "command timed out"
            );
            Err(AdapterError::Timeout { description: description.to_string(), after: timeout })
        }
    }
}

/// Map a non-zero exit into [`AdapterError::CommandFailed`], returning trimmed stdout otherwise.
pub fn check_success(output: &Output, description: &str) -> Result<String, AdapterError> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }
    Err(AdapterError::CommandFailed {
        description: description.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Build a `bash -c` command running `script` with strict error handling.
pub fn bash(script: &str) -> Command {
    let mut cmd = Command::new("bash");
    cmd.arg("-c").arg(format!("set -euo pipefail\n{script}"));
    cmd
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
