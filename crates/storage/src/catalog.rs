// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk catalog for one environment.
//!
//! A catalog is written atomically (temp file + rename). The previous
//! generation is kept as `.bak` / `.bak.2` / `.bak.3` for manual recovery.

use chrono::{DateTime, Utc};
use rb_core::{RollbackExecution, RollbackPoint};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current catalog schema version
pub const CURRENT_CATALOG_VERSION: u32 = 1;

const MAX_BAK_FILES: u32 = 3;

/// A record tagged with its insertion sequence.
///
/// The sequence breaks ties between records created in the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<T> {
    pub seq: u64,
    pub record: T,
}

/// Every rollback point and execution recorded for one environment.
///
/// Published catalogs are immutable; writers clone, modify, persist, then
/// publish the new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "v")]
    pub version: u32,
    pub environment: String,
    pub next_seq: u64,
    #[serde(default)]
    pub points: Vec<Entry<RollbackPoint>>,
    #[serde(default)]
    pub executions: Vec<Entry<RollbackExecution>>,
    pub updated_at: DateTime<Utc>,
}

impl Catalog {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            version: CURRENT_CATALOG_VERSION,
            environment: environment.into(),
            next_seq: 1,
            points: Vec::new(),
            executions: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn point(&self, id: &str) -> Option<&RollbackPoint> {
        self.points.iter().map(|e| &e.record).find(|p| p.id == id)
    }

    pub fn execution(&self, id: &str) -> Option<&RollbackExecution> {
        self.executions.iter().map(|e| &e.record).find(|x| x.id == id)
    }

    /// The non-terminal execution for this environment, if any.
    pub fn active_execution(&self) -> Option<&RollbackExecution> {
        self.executions.iter().map(|e| &e.record).find(|x| !x.is_terminal())
    }

    pub(crate) fn load(path: &Path) -> Result<Option<Self>, crate::StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let catalog: Catalog = serde_json::from_slice(&bytes)?;
        if catalog.version > CURRENT_CATALOG_VERSION {
            return Err(crate::StoreError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: catalog.version,
            });
        }
        Ok(Some(catalog))
    }

    /// Durably write the catalog. Returns only after the rename is complete.
    pub(crate) fn save(&mut self, path: &Path) -> Result<(), crate::StoreError> {
        self.updated_at = Utc::now();
        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        if path.exists() {
            if let Err(e) = fs::copy(path, rotate_bak_path(path)) {
                tracing::warn!(path = %path.display(), error = %e, "failed to back up catalog");
            }
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
