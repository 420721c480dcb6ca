// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rb_core::{ExecutionStatus, PointId, SnapshotKind};
use tempfile::{tempdir, TempDir};

fn open(retention: RetentionConfig) -> (TempDir, PointStore) {
    let dir = tempdir().unwrap();
    let store = PointStore::open(dir.path().join("catalog"), retention).unwrap();
    (dir, store)
}

fn point(env: &str, created_at_ms: u64) -> RollbackPoint {
    RollbackPoint::builder().environment(env).created_at_ms(created_at_ms).build()
}

fn execution(env: &str, point_id: &PointId, started_at_ms: u64) -> RollbackExecution {
    RollbackExecution::new(point_id.clone(), env, "ops", true, started_at_ms)
}

fn finished(mut exec: RollbackExecution) -> RollbackExecution {
    exec.transition(ExecutionStatus::Validating, exec.started_at_ms).unwrap();
    exec.fail("environment-reachable", "down", exec.started_at_ms).unwrap();
    exec
}

#[test]
fn save_and_get_point() {
    let (_dir, store) = open(RetentionConfig::default());
    let p = point("staging", 1);

    let evicted = store.save_point(&p).unwrap();

    assert!(evicted.is_empty());
    assert_eq!(store.get_point(&p.id).unwrap(), p);
    assert_eq!(store.environments(), vec!["staging".to_string()]);
}

#[test]
fn get_unknown_point_is_not_found() {
    let (_dir, store) = open(RetentionConfig::default());
    let err = store.get_point("rbp-missing").unwrap_err();
    assert!(matches!(err, StoreError::PointNotFound(ref id) if id == "rbp-missing"));
}

#[test]
fn saving_same_point_twice_is_idempotent() {
    let (_dir, store) = open(RetentionConfig::default());
    let p = point("staging", 1);
    store.save_point(&p).unwrap();
    store.save_point(&p).unwrap();
    assert_eq!(store.list_points(Some("staging")).len(), 1);
}

#[test]
fn conflicting_point_is_rejected() {
    let (_dir, store) = open(RetentionConfig::default());
    let p = point("staging", 1);
    store.save_point(&p).unwrap();

    let mut changed = p.clone();
    changed.release_version = "9.9.9".to_string();
    assert!(matches!(store.save_point(&changed), Err(StoreError::PointConflict(_))));
}

#[test]
fn incomplete_point_is_rejected() {
    let (_dir, store) = open(RetentionConfig::default());
    let mut p = point("staging", 1);
    p.snapshots.remove(&SnapshotKind::ApplicationCode);

    let err = store.save_point(&p).unwrap_err();

    assert!(err.to_string().contains("application-code"));
    assert!(store.list_points(None).is_empty());
}

#[test]
fn invalid_environment_name_is_rejected() {
    let (_dir, store) = open(RetentionConfig::default());
    let err = store.save_point(&point("../escape", 1)).unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));
}

#[test]
fn list_is_newest_first_and_restartable() {
    let (_dir, store) = open(RetentionConfig::default());
    let ids: Vec<PointId> = [30, 10, 20]
        .into_iter()
        .map(|t| {
            let p = point("staging", t);
            store.save_point(&p).unwrap();
            p.id
        })
        .collect();

    let listing = store.list_points(Some("staging"));
    let first: Vec<&PointId> = listing.iter().map(|p| &p.id).collect();
    let second: Vec<&PointId> = (&listing).into_iter().map(|p| &p.id).collect();

    assert_eq!(first, vec![&ids[0], &ids[2], &ids[1]]);
    assert_eq!(first, second);
    assert_eq!(listing.iter().len(), 3);
}

#[test]
fn same_timestamp_orders_by_insertion() {
    let (_dir, store) = open(RetentionConfig::default());
    let a = point("staging", 5);
    let b = point("staging", 5);
    store.save_point(&a).unwrap();
    store.save_point(&b).unwrap();

    let listing = store.list_points(None);
    let order: Vec<&PointId> = listing.iter().map(|p| &p.id).collect();
    assert_eq!(order, vec![&b.id, &a.id]);
}

#[test]
fn list_filters_by_environment() {
    let (_dir, store) = open(RetentionConfig::default());
    store.save_point(&point("staging", 1)).unwrap();
    store.save_point(&point("production", 2)).unwrap();

    assert_eq!(store.list_points(Some("staging")).len(), 1);
    assert_eq!(store.list_points(Some("production")).len(), 1);
    assert_eq!(store.list_points(None).len(), 2);
    assert!(store.list_points(Some("qa")).is_empty());
}

#[test]
fn listing_is_unaffected_by_later_writes() {
    let (_dir, store) = open(RetentionConfig::default());
    store.save_point(&point("staging", 1)).unwrap();
    let listing = store.list_points(Some("staging"));

    store.save_point(&point("staging", 2)).unwrap();

    assert_eq!(listing.len(), 1);
    assert_eq!(store.list_points(Some("staging")).len(), 2);
}

#[test]
fn inserting_beyond_cap_evicts_oldest_in_that_environment_only() {
    let (_dir, store) = open(RetentionConfig::default().points(50));
    let mut staging = Vec::new();
    for t in 0..50u64 {
        let p = point("staging", 1_000 + t);
        store.save_point(&p).unwrap();
        staging.push(p);
    }
    let prod = point("production", 1);
    store.save_point(&prod).unwrap();

    let evicted = store.save_point(&point("staging", 5_000)).unwrap();

    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].id, staging[0].id);
    assert_eq!(store.list_points(Some("staging")).len(), 50);
    assert!(store.get_point(&staging[0].id).is_err());
    assert!(store.get_point(&staging[1].id).is_ok());
    assert!(store.get_point(&prod.id).is_ok());
}

#[test]
fn eviction_uses_creation_time_not_insertion_order() {
    let (_dir, store) = open(RetentionConfig::default().points(2));
    let newer = point("staging", 200);
    let older = point("staging", 100);
    store.save_point(&newer).unwrap();
    store.save_point(&older).unwrap();

    let evicted = store.save_point(&point("staging", 300)).unwrap();

    assert_eq!(evicted, vec![older]);
}

#[test]
fn points_of_in_flight_execution_are_pinned() {
    let (_dir, store) = open(RetentionConfig::default().points(1));
    let target = point("staging", 1);
    store.save_point(&target).unwrap();
    store.save_execution(&execution("staging", &target.id, 10)).unwrap();

    let evicted = store.save_point(&point("staging", 2)).unwrap();

    assert!(evicted.is_empty());
    assert_eq!(store.list_points(Some("staging")).len(), 2);
}

#[test]
fn execution_save_updates_in_place() {
    let (_dir, store) = open(RetentionConfig::default());
    let target = point("staging", 1);
    let mut exec = execution("staging", &target.id, 10);
    store.save_execution(&exec).unwrap();

    exec.transition(ExecutionStatus::Validating, 11).unwrap();
    store.save_execution(&exec).unwrap();

    assert_eq!(store.list_executions(None).len(), 1);
    assert_eq!(store.get_execution(&exec.id).unwrap().status, ExecutionStatus::Validating);
    assert_eq!(store.active_execution("staging").unwrap().id, exec.id);
}

#[test]
fn terminal_execution_is_not_active() {
    let (_dir, store) = open(RetentionConfig::default());
    let exec = finished(execution("staging", &PointId::from_string("rbp-1"), 10));
    store.save_execution(&exec).unwrap();
    assert!(store.active_execution("staging").is_none());
    assert!(store.active_execution("unknown").is_none());
}

#[test]
fn execution_retention_skips_in_flight() {
    let (_dir, store) = open(RetentionConfig::default().executions(2));
    let pid = PointId::from_string("rbp-1");
    let in_flight = execution("staging", &pid, 1);
    store.save_execution(&in_flight).unwrap();
    let old = finished(execution("staging", &pid, 2));
    store.save_execution(&old).unwrap();

    store.save_execution(&finished(execution("staging", &pid, 3))).unwrap();

    assert_eq!(store.list_executions(Some("staging")).len(), 2);
    assert!(store.get_execution(&in_flight.id).is_ok());
    assert!(matches!(store.get_execution(&old.id), Err(StoreError::ExecutionNotFound(_))));
}

#[test]
fn reopen_recovers_catalogs() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("catalog");
    let p = point("staging", 1);
    let exec = execution("staging", &p.id, 10);
    {
        let store = PointStore::open(&root, RetentionConfig::default()).unwrap();
        store.save_point(&p).unwrap();
        store.save_execution(&exec).unwrap();
    }

    let store = PointStore::open(&root, RetentionConfig::default()).unwrap();

    assert_eq!(store.get_point(&p.id).unwrap(), p);
    assert_eq!(store.get_execution(&exec.id).unwrap(), exec);
    store.save_point(&point("staging", 2)).unwrap();
    let created: Vec<u64> =
        store.list_points(Some("staging")).iter().map(|p| p.created_at_ms).collect();
    assert_eq!(created, vec![2, 1]);
}

#[test]
fn concurrent_writers_across_environments() {
    let (_dir, store) = open(RetentionConfig::default());
    let store = Arc::new(store);
    let handles: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|env| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for t in 0..10 {
                    store.save_point(&point(env, t)).unwrap();
                    let _ = store.list_points(None).len();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(store.list_points(None).len(), 40);
    for env in ["a", "b", "c", "d"] {
        assert_eq!(store.list_points(Some(env)).len(), 10);
    }
}

#[test]
fn refresh_picks_up_writes_from_another_store() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("catalog");
    let a = PointStore::open(&root, RetentionConfig::default()).unwrap();
    let b = PointStore::open(&root, RetentionConfig::default()).unwrap();
    let pa = point("staging", 1);
    let pb = point("staging", 2);
    let exec = finished(execution("staging", &pa.id, 5));

    a.save_point(&pa).unwrap();
    a.save_execution(&exec).unwrap();
    b.refresh("staging").unwrap();
    b.save_point(&pb).unwrap();

    let reopened = PointStore::open(&root, RetentionConfig::default()).unwrap();
    assert_eq!(reopened.get_point(&pa.id).unwrap(), pa);
    assert_eq!(reopened.get_point(&pb.id).unwrap(), pb);
    assert_eq!(reopened.get_execution(&exec.id).unwrap(), exec);
}

#[test]
fn refresh_of_unwritten_environment_is_empty() {
    let (_dir, store) = open(RetentionConfig::default());
    store.refresh("staging").unwrap();
    assert!(store.list_points(Some("staging")).is_empty());
    assert!(store.active_execution("staging").is_none());
}
