//! Failed rollback specs: pre-check rejections and auto-restore

use crate::prelude::*;

#[test]
fn post_check_failure_restores_pre_rollback_state() {
    let temp = Project::deployed();
    let id = temp.create_point("production");
    temp.deploy("production", "v2");
    let v2 = temp.head("production");
    temp.break_operation("production", "smoke-test");

    temp.rb()
        .args(&["rollback", "production", &id])
        .exits(1)
        .stdout_has("Auto-restoring safety point")
        .stdout_has("phase:        post_validating")
        .stdout_has("step:         smoke-test")
        .stdout_has("auto-restore: restored the pre-rollback state")
        .stderr_has("post_validating failed at step `smoke-test`");

    assert_eq!(temp.read("production/data.txt"), "rows=v2\n");
    assert_eq!(temp.read("production/app.toml"), "release = \"v2\"\n");
    assert_eq!(temp.head("production"), v2);
}

#[test]
fn disabled_auto_restore_keeps_target_state() {
    let temp = Project::deployed();
    let v1 = temp.head("production");
    let id = temp.create_point("production");
    temp.deploy("production", "v2");
    temp.break_operation("production", "smoke-test");

    temp.rb()
        .args(&["rollback", "production", &id, "--no-auto-restore"])
        .exits(1)
        .stdout_has("auto-restore: disabled")
        .stdout_lacks("Auto-restoring");

    assert_eq!(temp.read("production/data.txt"), "rows=v1\n");
    assert_eq!(temp.head("production"), v1);
}

#[test]
fn failed_data_restore_reports_incomplete_auto_restore() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");
    temp.deploy("staging", "v2");
    let v2 = temp.head("staging");
    temp.break_operation("staging", "data-restore");

    temp.rb()
        .args(&["rollback", "staging", &id])
        .exits(1)
        .stdout_has("phase:        executing")
        .stdout_has("step:         restore-data-store")
        .stdout_has("auto-restore: incomplete, manual intervention required");

    // The data store never changed; code and configuration were never touched.
    assert_eq!(temp.read("staging/data.txt"), "rows=v2\n");
    assert_eq!(temp.head("staging"), v2);
}

#[test]
fn pre_check_failure_changes_nothing() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");
    temp.deploy("staging", "v2");
    let v2 = temp.head("staging");
    temp.break_operation("staging", "environment-ping");

    temp.rb()
        .args(&["rollback", "staging", &id])
        .exits(1)
        .stdout_has("phase:        validating")
        .stdout_has("step:         environment-reachable")
        .stdout_has("auto-restore: not needed (nothing was changed)")
        .stdout_lacks("Rolling back staging");

    assert_eq!(temp.read("staging/data.txt"), "rows=v2\n");
    assert_eq!(temp.head("staging"), v2);
    let points = temp.rb().args(&["list-points", "staging", "-o", "json"]).passes().json();
    assert_eq!(points.as_array().unwrap().len(), 1);
}

#[test]
fn point_of_other_environment_is_rejected() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");

    temp.rb()
        .args(&["rollback", "production", &id])
        .exits(1)
        .stderr_has("belongs to environment");

    temp.rb().args(&["list-executions"]).passes().stdout_eq("No rollback executions\n");
}

#[test]
fn missing_point_is_rejected() {
    let temp = Project::deployed();

    temp.rb()
        .args(&["rollback", "staging", "rbp-missing"])
        .exits(1)
        .stderr_has("rollback point not found: rbp-missing");

    temp.rb().args(&["list-executions"]).passes().stdout_eq("No rollback executions\n");
}

#[test]
fn unknown_environment_is_rejected() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");

    temp.rb().args(&["rollback", "qa", &id]).exits(1).stderr_has("unknown environment: qa");
}
