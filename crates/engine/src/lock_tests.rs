// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn second_acquire_of_same_environment_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let locks = EnvironmentLocks::new(dir.path());

    let _guard = locks.acquire("production").unwrap();
    let err = locks.acquire("production").unwrap_err();

    assert!(matches!(err, RecoveryError::ExecutionInProgress(ref env) if env == "production"));
}

#[test]
fn different_environments_do_not_contend() {
    let dir = tempfile::tempdir().unwrap();
    let locks = EnvironmentLocks::new(dir.path());

    let a = locks.acquire("staging").unwrap();
    let b = locks.acquire("production").unwrap();

    assert_eq!(a.environment(), "staging");
    assert_eq!(b.environment(), "production");
}

#[test]
fn dropping_guard_releases_environment() {
    let dir = tempfile::tempdir().unwrap();
    let locks = EnvironmentLocks::new(dir.path());

    drop(locks.acquire("staging").unwrap());

    assert!(!locks.is_held("staging"));
    assert!(locks.acquire("staging").is_ok());
}

#[test]
fn lock_file_held_elsewhere_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let other_process = EnvironmentLocks::new(dir.path());
    let this_process = EnvironmentLocks::new(dir.path());

    let _guard = other_process.acquire("staging").unwrap();
    let err = this_process.acquire("staging").unwrap_err();

    assert!(matches!(err, RecoveryError::ExecutionInProgress(_)));
    assert!(!this_process.is_held("staging"));
}

#[test]
fn lock_file_records_holder_pid() {
    let dir = tempfile::tempdir().unwrap();
    let locks = EnvironmentLocks::new(dir.path());
    let _guard = locks.acquire("staging").unwrap();

    let content = std::fs::read_to_string(dir.path().join("staging.lock")).unwrap();
    assert_eq!(content.trim(), std::process::id().to_string());
}
