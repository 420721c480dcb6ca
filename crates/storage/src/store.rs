// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback point store.
//!
//! One catalog file per environment under the store root. Writes within an
//! environment are serialized by that environment's write lock; reads take
//! the currently published catalog and never block on writers.
//!
//! Retention is enforced only after the write that exceeds capacity has been
//! made durable, so a crash can leave one extra record but never lose the
//! new one.

use crate::catalog::{Catalog, Entry};
use crate::listing::Listing;
use parking_lot::{Mutex, RwLock};
use rb_core::config::validate_environment_name;
use rb_core::{ConfigError, RetentionConfig, RollbackExecution, RollbackPoint};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rollback point not found: {0}")]
    PointNotFound(String),
    #[error("rollback execution not found: {0}")]
    ExecutionNotFound(String),
    #[error("rollback point {id} is incomplete (missing {missing})")]
    IncompletePoint { id: String, missing: String },
    #[error("rollback point {0} already exists with different content")]
    PointConflict(String),
    #[error("unsupported catalog version {found} in {path}")]
    UnsupportedVersion { path: PathBuf, found: u32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

struct Shard {
    path: PathBuf,
    write: Mutex<()>,
    current: RwLock<Arc<Catalog>>,
}

impl Shard {
    fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read())
    }

    /// Persist `catalog` and publish it to readers.
    ///
    /// Caller must hold the write lock.
    fn commit(&self, mut catalog: Catalog) -> Result<(), StoreError> {
        catalog.save(&self.path)?;
        *self.current.write() = Arc::new(catalog);
        Ok(())
    }
}

/// Durable catalog of rollback points and executions.
pub struct PointStore {
    root: PathBuf,
    retention: RetentionConfig,
    shards: RwLock<BTreeMap<String, Arc<Shard>>>,
}

impl PointStore {
    /// Open (or create) a store rooted at `root`, loading every catalog found.
    pub fn open(root: impl Into<PathBuf>, retention: RetentionConfig) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let mut shards = BTreeMap::new();
        for entry in std::fs::read_dir(&root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(environment) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_environment_name(environment).is_err() {
                tracing::warn!(path = %path.display(), "skipping catalog with invalid name");
                continue;
            }
            let catalog = Catalog::load(&path)?.unwrap_or_else(|| Catalog::new(environment));
            tracing::info!(
                environment,
                points = catalog.points.len(),
                executions = catalog.executions.len(),
                "loaded catalog"
            );
            shards.insert(environment.to_string(), Arc::new(Self::shard(path, catalog)));
        }

        Ok(Self { root, retention, shards: RwLock::new(shards) })
    }

    fn shard(path: PathBuf, catalog: Catalog) -> Shard {
        Shard { path, write: Mutex::new(()), current: RwLock::new(Arc::new(catalog)) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> RetentionConfig {
        self.retention
    }

    /// Environments that have a catalog.
    pub fn environments(&self) -> Vec<String> {
        self.shards.read().keys().cloned().collect()
    }

    fn existing_shard(&self, environment: &str) -> Option<Arc<Shard>> {
        self.shards.read().get(environment).cloned()
    }

    fn shard_for(&self, environment: &str) -> Result<Arc<Shard>, StoreError> {
        if let Some(shard) = self.existing_shard(environment) {
            return Ok(shard);
        }
        validate_environment_name(environment)?;
        let mut shards = self.shards.write();
        let shard = shards.entry(environment.to_string()).or_insert_with(|| {
            let path = self.root.join(format!("{}.json", environment));
            Arc::new(Self::shard(path, Catalog::new(environment)))
        });
        Ok(Arc::clone(shard))
    }

    /// Reload `environment`'s catalog from disk.
    ///
    /// Other processes may have written the catalog since it was loaded.
    /// Call after taking the environment's cross-process lock, before any
    /// read that decides what to write.
    pub fn refresh(&self, environment: &str) -> Result<(), StoreError> {
        let shard = self.shard_for(environment)?;
        let _guard = shard.write.lock();
        let catalog = Catalog::load(&shard.path)?.unwrap_or_else(|| Catalog::new(environment));
        tracing::debug!(
            environment,
            points = catalog.points.len(),
            executions = catalog.executions.len(),
            "refreshed catalog"
        );
        *shard.current.write() = Arc::new(catalog);
        Ok(())
    }

    /// Append a rollback point.
    ///
    /// Saving an identical point again is a no-op. Returns the points evicted
    /// by retention so the caller can discard their artifacts.
    pub fn save_point(&self, point: &RollbackPoint) -> Result<Vec<RollbackPoint>, StoreError> {
        if !point.is_complete() {
            let missing: Vec<String> =
                point.missing_kinds().iter().map(|k| k.to_string()).collect();
            let missing = if missing.is_empty() {
                "consistent snapshots".to_string()
            } else {
                missing.join(", ")
            };
            return Err(StoreError::IncompletePoint { id: point.id.to_string(), missing });
        }

        let shard = self.shard_for(&point.environment)?;
        let _guard = shard.write.lock();
        let current = shard.snapshot();
        if let Some(existing) = current.point(&point.id) {
            if existing == point {
                return Ok(Vec::new());
            }
            return Err(StoreError::PointConflict(point.id.to_string()));
        }

        let mut catalog = (*current).clone();
        let seq = catalog.take_seq();
        catalog.points.push(Entry { seq, record: point.clone() });
        shard.commit(catalog.clone())?;

        let evicted = evict_points(&mut catalog, self.retention.points);
        if !evicted.is_empty() {
            shard.commit(catalog)?;
            for p in &evicted {
                tracing::info!(
                    environment = %point.environment,
                    point_id = %p.id,
                    "evicted rollback point"
                );
            }
        }
        Ok(evicted)
    }

    /// Insert or update an execution record.
    ///
    /// Terminal executions beyond the retention cap are evicted oldest first;
    /// in-flight executions are never evicted.
    pub fn save_execution(&self, execution: &RollbackExecution) -> Result<(), StoreError> {
        let shard = self.shard_for(&execution.environment)?;
        let _guard = shard.write.lock();
        let current = shard.snapshot();

        let mut catalog = (*current).clone();
        match catalog.executions.iter_mut().find(|e| e.record.id == execution.id) {
            Some(entry) if entry.record == *execution => return Ok(()),
            Some(entry) => entry.record = execution.clone(),
            None => {
                let seq = catalog.take_seq();
                catalog.executions.push(Entry { seq, record: execution.clone() });
            }
        }
        shard.commit(catalog.clone())?;

        let evicted = evict_executions(&mut catalog, self.retention.executions);
        if evicted > 0 {
            shard.commit(catalog)?;
            tracing::info!(environment = %execution.environment, evicted, "evicted executions");
        }
        Ok(())
    }

    pub fn get_point(&self, id: &str) -> Result<RollbackPoint, StoreError> {
        let shards: Vec<Arc<Shard>> = self.shards.read().values().cloned().collect();
        shards
            .iter()
            .find_map(|s| s.snapshot().point(id).cloned())
            .ok_or_else(|| StoreError::PointNotFound(id.to_string()))
    }

    pub fn get_execution(&self, id: &str) -> Result<RollbackExecution, StoreError> {
        let shards: Vec<Arc<Shard>> = self.shards.read().values().cloned().collect();
        shards
            .iter()
            .find_map(|s| s.snapshot().execution(id).cloned())
            .ok_or_else(|| StoreError::ExecutionNotFound(id.to_string()))
    }

    /// The in-flight execution for `environment`, if any.
    pub fn active_execution(&self, environment: &str) -> Option<RollbackExecution> {
        self.existing_shard(environment)?.snapshot().active_execution().cloned()
    }

    /// Rollback points, newest first, optionally filtered by environment.
    pub fn list_points(&self, environment: Option<&str>) -> Listing<RollbackPoint> {
        Listing::new(self.catalogs(environment), |c| &c.points, |p| p.created_at_ms)
    }

    /// Rollback executions, newest first, optionally filtered by environment.
    pub fn list_executions(&self, environment: Option<&str>) -> Listing<RollbackExecution> {
        Listing::new(self.catalogs(environment), |c| &c.executions, |x| x.started_at_ms)
    }

    fn catalogs(&self, environment: Option<&str>) -> Vec<Arc<Catalog>> {
        let shards = self.shards.read();
        match environment {
            Some(env) => shards.get(env).map(|s| vec![s.snapshot()]).unwrap_or_default(),
            None => shards.values().map(|s| s.snapshot()).collect(),
        }
    }
}

/// Evict the oldest points beyond `cap`, by creation time then insertion order.
///
/// Points referenced by an in-flight execution (as target or safety point)
/// are kept even when that leaves the catalog over capacity.
fn evict_points(catalog: &mut Catalog, cap: usize) -> Vec<RollbackPoint> {
    if catalog.points.len() <= cap {
        return Vec::new();
    }
    let pinned: HashSet<String> = catalog
        .executions
        .iter()
        .map(|e| &e.record)
        .filter(|x| !x.is_terminal())
        .flat_map(|x| {
            std::iter::once(x.point_id.to_string())
                .chain(x.safety_point_id.as_ref().map(|s| s.to_string()))
        })
        .collect();

    let mut candidates: Vec<(u64, u64, usize)> = catalog
        .points
        .iter()
        .enumerate()
        .filter(|(_, e)| !pinned.contains(e.record.id.as_str()))
        .map(|(i, e)| (e.record.created_at_ms, e.seq, i))
        .collect();
    candidates.sort();

    let excess = catalog.points.len() - cap;
    let mut doomed: Vec<usize> = candidates.into_iter().take(excess).map(|(_, _, i)| i).collect();
    doomed.sort_unstable_by(|a, b| b.cmp(a));
    let mut evicted: Vec<RollbackPoint> =
        doomed.into_iter().map(|i| catalog.points.remove(i).record).collect();
    evicted.reverse();
    evicted
}

/// Evict the oldest terminal executions beyond `cap`. Returns the count removed.
fn evict_executions(catalog: &mut Catalog, cap: usize) -> usize {
    if catalog.executions.len() <= cap {
        return 0;
    }
    let mut candidates: Vec<(u64, u64, usize)> = catalog
        .executions
        .iter()
        .enumerate()
        .filter(|(_, e)| e.record.is_terminal())
        .map(|(i, e)| (e.record.started_at_ms, e.seq, i))
        .collect();
    candidates.sort();

    let excess = catalog.executions.len() - cap;
    let mut doomed: Vec<usize> = candidates.into_iter().take(excess).map(|(_, _, i)| i).collect();
    doomed.sort_unstable_by(|a, b| b.cmp(a));
    for &i in &doomed {
        catalog.executions.remove(i);
    }
    doomed.len()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
