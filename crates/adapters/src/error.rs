// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use thiserror::Error;

/// Errors from external collaborator calls
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("environment '{0}' is not configured")]
    UnknownEnvironment(String),
    #[error("operation '{operation}' is not configured for environment '{environment}'")]
    NotConfigured { environment: String, operation: String },
    #[error("failed to spawn {description}: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} timed out after {}s", .after.as_secs())]
    Timeout { description: String, after: Duration },
    #[error("{description} exited with code {code}: {stderr}")]
    CommandFailed { description: String, code: i32, stderr: String },
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("invalid locator '{0}'")]
    InvalidLocator(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
}

impl AdapterError {
    pub fn is_not_configured(&self) -> bool {
        matches!(self, AdapterError::NotConfigured { .. })
    }
}
